use crate::context::{normalize, ExtractContext};
use crate::Extractor;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};
use uma_state::Character;
use uma_vision::preprocess::binarize_rgb;
use uma_vision::{crop, derive, BoundingBox, Regions};

const NAME: &str = "character";

/// Name, nickname and rank from the plate above the parameter frame.
pub struct CharacterExtractor {
    ctx: Arc<ExtractContext>,
}

impl CharacterExtractor {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx }
    }

    fn regions(&self, working: &RgbaImage) -> Option<Regions> {
        let layout = &self.ctx.layouts.character;
        let Some(anchor) = self.ctx.assets.character_anchor.locate(working) else {
            info!("character: parameter frame not found");
            return None;
        };
        debug!("character: anchor {:?} score {:.3}", anchor.bbox, anchor.score);
        self.ctx.dump_anchor(NAME, working, &anchor.bbox);
        Some(derive(
            anchor.bbox,
            &[
                layout.name.clone(),
                layout.nickname.clone(),
                layout.rank.clone(),
            ],
        ))
    }

    /// Name and nickname, both reconciled against master data.
    pub fn identity(&self, image: &RgbaImage) -> Character {
        let working = normalize(image, &self.ctx.layouts.character.normalization);
        match self.regions(&working) {
            Some(regions) => self.read_identity(&working, &regions),
            None => Character::default(),
        }
    }

    pub fn rank(&self, image: &RgbaImage) -> String {
        let working = normalize(image, &self.ctx.layouts.character.normalization);
        match self.regions(&working) {
            Some(regions) => self.read_rank(&working, &regions),
            None => String::new(),
        }
    }

    fn read_identity(&self, working: &RgbaImage, regions: &Regions) -> Character {
        let layout = &self.ctx.layouts.character;
        let reconciler = &self.ctx.reconciler;
        let master = &self.ctx.master;

        let raw = self.read_line(working, regions.get(&layout.name.name), layout.name_border, "name");
        let Some(name) = reconciler.reconcile_any(&raw, master.character_names()) else {
            debug!("character: '{}' matches no character", raw);
            return Character::default();
        };
        info!("character: '{}' -> {} ({:.3})", raw, name.name, name.score);

        let nicknames = master
            .character(&name.name)
            .map(|c| c.nicknames.as_slice())
            .unwrap_or_default();
        let nickname = if nicknames.is_empty() {
            String::new()
        } else {
            let raw = self.read_line(
                working,
                regions.get(&layout.nickname.name),
                layout.nickname_border,
                "nickname",
            );
            reconciler
                .reconcile_with_floor(
                    &raw,
                    nicknames.iter().map(String::as_str),
                    layout.nickname_floor,
                )
                .map(|r| r.name)
                .unwrap_or_default()
        };

        Character {
            name: name.name,
            nickname,
            rank: String::new(),
        }
    }

    fn read_line(
        &self,
        working: &RgbaImage,
        bbox: Option<&BoundingBox>,
        border: [u8; 3],
        field: &str,
    ) -> String {
        let Some(cropped) = bbox.and_then(|b| crop(working, b)) else {
            return String::new();
        };
        let binary = binarize_rgb(&cropped, border);
        self.ctx.dump(NAME, &format!("{field}.png"), || {
            DynamicImage::ImageLuma8(binary.clone())
        });
        self.ctx
            .ocr
            .recognize_text_single_line(&binary, &self.ctx.layouts.character.lang)
    }

    fn read_rank(&self, working: &RgbaImage, regions: &Regions) -> String {
        let layout = &self.ctx.layouts.character;
        let Some(cropped) = regions.get(&layout.rank.name).and_then(|b| crop(working, b)) else {
            return String::new();
        };
        self.ctx.dump(NAME, "rank.png", || DynamicImage::ImageRgba8(cropped.clone()));
        let rank = self
            .ctx
            .assets
            .ranks
            .classify(&cropped, layout.ranks.threshold)
            .unwrap_or_default()
            .to_string();
        debug!("character: rank '{}'", rank);
        rank
    }
}

impl Extractor for CharacterExtractor {
    type Record = Character;

    fn extract(&self, image: &RgbaImage) -> Character {
        let working = normalize(image, &self.ctx.layouts.character.normalization);
        let Some(regions) = self.regions(&working) else {
            return Character::default();
        };
        Character {
            rank: self.read_rank(&working, &regions),
            ..self.read_identity(&working, &regions)
        }
    }
}
