use crate::context::{normalize, ExtractContext};
use crate::Extractor;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info};
use uma_state::Parameters;
use uma_vision::derive;

const NAME: &str = "status";

/// Reads the five stat values under the parameter frame.
pub struct StatusExtractor {
    ctx: Arc<ExtractContext>,
}

impl StatusExtractor {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx }
    }
}

impl Extractor for StatusExtractor {
    type Record = Parameters;

    fn extract(&self, image: &RgbaImage) -> Parameters {
        let layout = &self.ctx.layouts.status;
        let working = normalize(image, &layout.normalization);
        let Some(anchor) = self.ctx.assets.status_anchor.locate(&working) else {
            info!("status: parameter frame not found");
            return Parameters::default();
        };
        debug!("status: anchor {:?} score {:.3}", anchor.bbox, anchor.score);
        self.ctx.dump_anchor(NAME, &working, &anchor.bbox);

        let regions = derive(anchor.bbox, &layout.params);
        let mut values = [0u32; 5];
        for (value, name) in values.iter_mut().zip(Parameters::NAMES) {
            if let Some(bbox) = regions.get(name) {
                *value = self
                    .ctx
                    .read_number(&working, bbox, layout.threshold, NAME, name);
            }
        }
        debug!("status: {:?}", values);
        Parameters::from_array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use uma_vision::BoundingBox;

    #[test]
    fn test_reads_each_parameter() {
        let ctx = context(FakeOcr::default());
        let mut img = canvas(800, 400, BACKGROUND);
        paste(&mut img, &params_frame(), 100, 60);
        let regions = derive(
            BoundingBox::new(100.0, 60.0, 700.0, 100.0),
            &ctx.layouts.status.params,
        );
        for (i, name) in Parameters::NAMES.iter().enumerate() {
            let b = regions[*name];
            mark(
                &mut img,
                b.start_x.ceil() as u32 + 2,
                b.start_y.ceil() as u32 + 2,
                i as u32 + 1,
                10,
            );
        }
        let params = StatusExtractor::new(ctx).extract(&img);
        assert_eq!(params, Parameters::from_array([10, 20, 30, 40, 50]));
    }

    #[test]
    fn test_missing_frame_gives_zeros() {
        let ctx = context(FakeOcr::default());
        let img = canvas(800, 400, BACKGROUND);
        assert_eq!(StatusExtractor::new(ctx).extract(&img), Parameters::default());
    }
}
