use image::RgbaImage;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use uma_extract::{
    AbilityExtractor, CharacterExtractor, DebugSink, DirDebugSink, ExtractContext, ExtractError,
    Extractor, Layouts, LocalResourceStore, NoopDebugSink, ResourceStore, SkillExtractor,
    StatusExtractor, SupportExtractor,
};
use uma_state::{Abilities, StatusRecord, SupportRecord};
use uma_vision::TesseractOcr;

use crate::config::Config;

/// Fans one upload out to every field-group extractor and joins the results.
pub struct Pipeline {
    ctx: Arc<ExtractContext>,
    timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load templates, master data and layouts from the configured resource root.
    pub fn load(config: &Config) -> Result<Self, ExtractError> {
        let store = LocalResourceStore::new(&config.root);
        let layouts = match &config.layout {
            Some(path) => {
                let bytes = store.open(path)?;
                Layouts::from_json(&bytes).map_err(|e| ExtractError::resource(path.clone(), e))?
            }
            None => Layouts::default(),
        };
        let debug: Arc<dyn DebugSink> = match &config.debug_dir {
            Some(dir) => {
                info!("Debug crops go to {}", dir.display());
                Arc::new(DirDebugSink::new(dir))
            }
            None => Arc::new(NoopDebugSink),
        };
        let ocr = TesseractOcr::new(&config.tesseract);
        info!(
            "Pipeline ready: resources {}, OCR {}",
            config.root.display(),
            if ocr.is_available() {
                "enabled"
            } else {
                "disabled"
            }
        );
        let ctx = ExtractContext::load(&store, layouts, Arc::new(ocr), debug)?;
        Ok(Self::new(Arc::new(ctx)).with_timeout(config.timeout()))
    }

    /// Every field group of a character detail screenshot.
    pub async fn extract_full(&self, image: Arc<RgbaImage>) -> Result<StatusRecord, ExtractError> {
        let ctx = &self.ctx;
        let character = CharacterExtractor::new(ctx.clone());
        let identity = spawn(&image, move |img| character.identity(img));
        let character = CharacterExtractor::new(ctx.clone());
        let rank = spawn(&image, move |img| character.rank(img));
        let status = StatusExtractor::new(ctx.clone());
        let params = spawn(&image, move |img| status.extract(img));
        let skill = SkillExtractor::new(ctx.clone());
        let skills = spawn(&image, move |img| skill.extract(img));
        let ability = AbilityExtractor::new(ctx.clone());
        let fields = spawn(&image, move |img| ability.fields(img));
        let ability = AbilityExtractor::new(ctx.clone());
        let distances = spawn(&image, move |img| ability.distances(img));
        let ability = AbilityExtractor::new(ctx.clone());
        let strategies = spawn(&image, move |img| ability.strategies(img));

        let joined = async {
            tokio::try_join!(
                join(identity),
                join(rank),
                join(params),
                join(skills),
                join(fields),
                join(distances),
                join(strategies),
            )
        };
        let (identity, rank, params, skills, fields, distances, strategies) =
            self.deadline(joined).await?;

        debug!(
            "extracted {} ({} skills)",
            identity.name,
            skills.normal_skills.len()
        );
        Ok(StatusRecord {
            character: identity.name,
            nickname: identity.nickname,
            rank,
            params,
            unique_skill: skills.unique_skill,
            skills: skills.normal_skills,
            abilities: Abilities {
                fields,
                distances,
                strategies,
            },
        })
    }

    /// Current and maximum stats from a support-character screenshot.
    pub async fn extract_support(
        &self,
        image: Arc<RgbaImage>,
    ) -> Result<SupportRecord, ExtractError> {
        let support = SupportExtractor::new(self.ctx.clone());
        let task = spawn(&image, move |img| support.extract(img));
        self.deadline(join(task)).await
    }

    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, ExtractError>>,
    ) -> Result<T, ExtractError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ExtractError::Timeout)?,
            None => fut.await,
        }
    }
}

fn spawn<T, F>(image: &Arc<RgbaImage>, f: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: FnOnce(&RgbaImage) -> T + Send + 'static,
{
    let image = image.clone();
    tokio::task::spawn_blocking(move || f(&image))
}

async fn join<T>(handle: JoinHandle<T>) -> Result<T, ExtractError> {
    handle.await.map_err(|e| ExtractError::Task(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgba};
    use uma_extract::MemoryResourceStore;
    use uma_vision::{LineBox, Ocr, ScaleRange};

    /// Digits take a while; everything else is blank.
    struct SlowOcr(Duration);

    impl Ocr for SlowOcr {
        fn recognize_digits(&self, _image: &GrayImage) -> String {
            std::thread::sleep(self.0);
            "123".to_string()
        }

        fn recognize_text_single_line(&self, _image: &GrayImage, _lang: &str) -> String {
            String::new()
        }

        fn recognize_line_boxes(&self, _image: &GrayImage, _lang: &str) -> Vec<LineBox> {
            Vec::new()
        }
    }

    fn frame() -> GrayImage {
        GrayImage::from_fn(300, 30, |x, y| {
            let v = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
            if (v >> 7) & 1 == 1 {
                Luma([170])
            } else {
                Luma([20])
            }
        })
    }

    fn layouts() -> Layouts {
        let mut layouts = Layouts::default();
        for (normalization, anchor) in [
            (
                &mut layouts.character.normalization,
                &mut layouts.character.anchor,
            ),
            (&mut layouts.ability.normalization, &mut layouts.ability.anchor),
            (&mut layouts.status.normalization, &mut layouts.status.anchor),
        ] {
            normalization.working_width = 400;
            normalization.band = (0.0, 1.0);
            anchor.scales = ScaleRange::fixed(1.0);
            anchor.resize_template = false;
        }
        layouts.skill.tab.scales = ScaleRange::fixed(1.0);
        layouts.support.anchor.scales = ScaleRange::fixed(1.0);
        layouts.support.min_anchor_width = 100.0;
        layouts
    }

    fn pipeline(ocr: SlowOcr) -> Pipeline {
        let layouts = layouts();
        let mut store = MemoryResourceStore::new();
        store.insert(
            "master_data/characters.json",
            r#"[{"name": "サイレンススズカ"}]"#.as_bytes().to_vec(),
        );
        store.insert("master_data/skills.json", b"{}".to_vec());
        let small = DynamicImage::ImageLuma8(GrayImage::from_fn(40, 40, |x, y| {
            Luma([((x * 7 + y * 13) % 5 * 50) as u8])
        }));
        let frame = DynamicImage::ImageLuma8(frame());
        store
            .insert_image(&layouts.status.anchor.template, &frame)
            .unwrap();
        store
            .insert_image(&layouts.support.anchor.template, &frame)
            .unwrap();
        store
            .insert_image(&layouts.skill.tab.template, &small)
            .unwrap();
        store
            .insert_image(&layouts.skill.frame_template, &small)
            .unwrap();
        for set in [
            &layouts.character.ranks,
            &layouts.ability.grades,
            &layouts.skill.circles,
        ] {
            for (file, _) in &set.icons {
                store
                    .insert_image(&format!("{}/{}", set.dir, file), &small)
                    .unwrap();
            }
        }
        let ctx =
            ExtractContext::load(&store, layouts, Arc::new(ocr), Arc::new(NoopDebugSink)).unwrap();
        Pipeline::new(Arc::new(ctx))
    }

    fn blank() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_pixel(400, 300, Rgba([200, 200, 200, 255])))
    }

    fn with_frame() -> Arc<RgbaImage> {
        let mut img = RgbaImage::from_pixel(400, 300, Rgba([200, 200, 200, 255]));
        let frame = DynamicImage::ImageLuma8(frame()).to_rgba8();
        image::imageops::overlay(&mut img, &frame, 50, 40);
        Arc::new(img)
    }

    #[tokio::test]
    async fn test_blank_upload_gives_empty_record() {
        let record = pipeline(SlowOcr(Duration::ZERO))
            .extract_full(blank())
            .await
            .unwrap();
        assert_eq!(record, StatusRecord::default());
    }

    #[tokio::test]
    async fn test_full_record_assembles_groups() {
        let record = pipeline(SlowOcr(Duration::ZERO))
            .extract_full(with_frame())
            .await
            .unwrap();
        assert_eq!(record.params.speed, 123);
        assert_eq!(record.params.wise, 123);
        assert_eq!(record.character, "");
        assert!(record.skills.is_empty());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["params"]["guts"], 123);
        assert_eq!(json["abilities"]["distances"]["long"], "");
    }

    #[tokio::test]
    async fn test_support_record() {
        let record = pipeline(SlowOcr(Duration::ZERO))
            .extract_support(with_frame())
            .await
            .unwrap();
        assert_eq!(record.params.stamina, 123);
        assert_eq!(record.params.max_power, 123);
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let result = pipeline(SlowOcr(Duration::from_millis(500)))
            .with_timeout(Some(Duration::from_millis(50)))
            .extract_full(with_frame())
            .await;
        assert!(matches!(result, Err(ExtractError::Timeout)));
    }
}
