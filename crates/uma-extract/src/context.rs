use crate::error::ExtractError;
use crate::layout::{AnchorSpec, IconSetSpec, Layouts, Normalization};
use crate::resources::{DebugSink, ResourceStore};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};
use uma_data::{MasterData, TextReconciler};
use uma_vision::preprocess::{crop_band, grayscale, resize_to_width};
use uma_vision::{
    crop, digits_only, BoundingBox, IconClassifier, MatchResult, MultiScaleMatcher, Ocr,
    PreparedTemplate,
};

pub const CHARACTERS_PATH: &str = "master_data/characters.json";
pub const SKILLS_PATH: &str = "master_data/skills.json";

/// Anchor template ready for matching.
pub struct LoadedAnchor {
    spec: AnchorSpec,
    template: PreparedTemplate,
}

impl LoadedAnchor {
    pub fn load(
        store: &dyn ResourceStore,
        spec: &AnchorSpec,
        working_width: u32,
    ) -> Result<Self, ExtractError> {
        let image = store.open_image(&spec.template)?.to_rgba8();
        let image = if spec.resize_template {
            resize_to_width(&image, working_width, FilterType::Triangle)
        } else {
            image
        };
        debug!(
            "anchor template {} prepared at {}x{}",
            spec.template,
            image.width(),
            image.height()
        );
        Ok(Self {
            spec: spec.clone(),
            template: PreparedTemplate::new(&grayscale(&image)),
        })
    }

    pub fn locate(&self, image: &RgbaImage) -> Option<MatchResult> {
        MultiScaleMatcher::with_min_score(self.spec.min_score).locate(
            &grayscale(image),
            &self.template,
            self.spec.scales,
        )
    }
}

fn load_icons(store: &dyn ResourceStore, spec: &IconSetSpec) -> Result<IconClassifier, ExtractError> {
    let mut icons = Vec::with_capacity(spec.icons.len());
    for (file, label) in &spec.icons {
        let path = format!("{}/{}", spec.dir, file);
        icons.push((label.clone(), store.open_image(&path)?.to_luma8()));
    }
    Ok(IconClassifier::new(spec.width, icons))
}

/// Templates and icon sets, decoded once.
pub struct Assets {
    pub character_anchor: LoadedAnchor,
    pub ability_anchor: LoadedAnchor,
    pub status_anchor: LoadedAnchor,
    pub skill_tab: LoadedAnchor,
    pub skill_frame: PreparedTemplate,
    pub support_anchor: LoadedAnchor,
    pub ranks: IconClassifier,
    pub grades: IconClassifier,
    pub circles: IconClassifier,
}

impl Assets {
    pub fn load(store: &dyn ResourceStore, layouts: &Layouts) -> Result<Self, ExtractError> {
        let character = &layouts.character;
        let ability = &layouts.ability;
        let status = &layouts.status;
        let skill = &layouts.skill;
        let support = &layouts.support;
        Ok(Self {
            character_anchor: LoadedAnchor::load(
                store,
                &character.anchor,
                character.normalization.working_width,
            )?,
            ability_anchor: LoadedAnchor::load(
                store,
                &ability.anchor,
                ability.normalization.working_width,
            )?,
            status_anchor: LoadedAnchor::load(
                store,
                &status.anchor,
                status.normalization.working_width,
            )?,
            skill_tab: LoadedAnchor::load(store, &skill.tab, skill.working_width)?,
            skill_frame: PreparedTemplate::new(
                &store.open_image(&skill.frame_template)?.to_luma8(),
            ),
            support_anchor: LoadedAnchor::load(
                store,
                &support.anchor,
                character.normalization.working_width,
            )?,
            ranks: load_icons(store, &character.ranks)?,
            grades: load_icons(store, &ability.grades)?,
            circles: load_icons(store, &skill.circles)?,
        })
    }
}

/// Master vocabulary from the store.
pub fn load_master(store: &dyn ResourceStore) -> Result<MasterData, ExtractError> {
    let characters = store.open(CHARACTERS_PATH)?;
    let skills = store.open(SKILLS_PATH)?;
    MasterData::from_json(&characters, &skills)
        .map_err(|e| ExtractError::resource("master_data", e))
}

/// Everything an extractor needs, immutable after construction and shared by `Arc`.
pub struct ExtractContext {
    pub layouts: Layouts,
    pub master: Arc<MasterData>,
    pub ocr: Arc<dyn Ocr>,
    pub debug: Arc<dyn DebugSink>,
    pub reconciler: TextReconciler,
    pub assets: Assets,
}

impl ExtractContext {
    pub fn load(
        store: &dyn ResourceStore,
        layouts: Layouts,
        ocr: Arc<dyn Ocr>,
        debug: Arc<dyn DebugSink>,
    ) -> Result<Self, ExtractError> {
        let master = Arc::new(load_master(store)?);
        let assets = Assets::load(store, &layouts)?;
        let reconciler = TextReconciler {
            glyph_width: layouts.skill.glyph_width,
        };
        info!(
            "extraction context ready: {} rank icons, {} grade icons, {} characters",
            assets.ranks.len(),
            assets.grades.len(),
            master.characters.len()
        );
        Ok(Self {
            layouts,
            master,
            ocr,
            debug,
            reconciler,
            assets,
        })
    }

    /// Hand an intermediate image to the debug sink as `<extractor>/<name>`.
    pub fn dump(&self, extractor: &str, name: &str, image: impl FnOnce() -> DynamicImage) {
        if self.debug.is_enabled() {
            self.debug
                .save_image(&image(), &format!("{}/{}", extractor, name));
        }
    }

    /// Working image and the matched anchor crop, for tuning layouts.
    pub fn dump_anchor(&self, extractor: &str, working: &RgbaImage, anchor: &BoundingBox) {
        if !self.debug.is_enabled() {
            return;
        }
        self.dump(extractor, "working.png", || {
            DynamicImage::ImageRgba8(working.clone())
        });
        if let Some(cropped) = crop(working, anchor) {
            self.dump(extractor, "anchor.png", || DynamicImage::ImageRgba8(cropped));
        }
    }

    /// Crop, binarize and read an integer; 0 when nothing readable is there.
    pub fn read_number(
        &self,
        image: &RgbaImage,
        bbox: &BoundingBox,
        threshold: u8,
        extractor: &str,
        field: &str,
    ) -> u32 {
        self.read_digits(image, bbox, threshold, extractor, field)
            .parse()
            .unwrap_or(0)
    }

    /// Digits recognized inside `bbox`, possibly empty.
    pub fn read_digits(
        &self,
        image: &RgbaImage,
        bbox: &BoundingBox,
        threshold: u8,
        extractor: &str,
        field: &str,
    ) -> String {
        let Some(cropped) = crop(image, bbox) else {
            debug!("{}: {} box {:?} is outside the image", extractor, field, bbox);
            return String::new();
        };
        let binary = uma_vision::preprocess::binarize(&cropped, threshold);
        self.dump(extractor, &format!("cropped_{field}.png"), || {
            DynamicImage::ImageRgba8(cropped.clone())
        });
        self.dump(extractor, &format!("binarized_{field}.png"), || {
            DynamicImage::ImageLuma8(binary.clone())
        });
        digits_only(&self.ocr.recognize_digits(&binary))
    }
}

/// Resize to the working width and keep the band holding the fields.
pub fn normalize(image: &RgbaImage, normalization: &Normalization) -> RgbaImage {
    let resized = resize_to_width(image, normalization.working_width, FilterType::Triangle);
    crop_band(&resized, normalization.band.0, normalization.band.1)
}
