use crate::context::ExtractContext;
use crate::Extractor;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info};
use uma_state::{Parameters, SupportParameters, SupportRecord};
use uma_vision::{derive, BoundingBox, RegionSpec};

const NAME: &str = "support";

/// Current and maximum stats from the support-character screen.
///
/// The upload is matched as-is, without the working-width normalization used for
/// character screens.
pub struct SupportExtractor {
    ctx: Arc<ExtractContext>,
}

impl SupportExtractor {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx }
    }

    fn read_row(
        &self,
        image: &RgbaImage,
        anchor: BoundingBox,
        specs: &[RegionSpec],
        max_digits: Option<usize>,
    ) -> [u32; 5] {
        let threshold = self.ctx.layouts.support.threshold;
        let regions = derive(anchor, specs);
        let mut values = [0u32; 5];
        for (value, spec) in values.iter_mut().zip(specs) {
            let Some(bbox) = regions.get(&spec.name) else {
                continue;
            };
            let digits = self
                .ctx
                .read_digits(image, bbox, threshold, NAME, &spec.name);
            let digits = match max_digits {
                Some(n) => trim_leading_glyph(&digits, n),
                None => digits.as_str(),
            };
            *value = digits.parse().unwrap_or(0);
        }
        values
    }
}

/// Values longer than `max_digits` picked up the separator in front of them.
fn trim_leading_glyph(digits: &str, max_digits: usize) -> &str {
    if digits.len() > max_digits {
        &digits[1..]
    } else {
        digits
    }
}

impl Extractor for SupportExtractor {
    type Record = SupportRecord;

    fn extract(&self, image: &RgbaImage) -> SupportRecord {
        let layout = &self.ctx.layouts.support;
        let Some(anchor) = self.ctx.assets.support_anchor.locate(image) else {
            info!("support: parameter frame not found");
            return SupportRecord::default();
        };
        let grid_width = anchor.bbox.width() * layout.grid_scale;
        if grid_width < layout.min_anchor_width {
            info!(
                "support: grid {:.0} px wide, below {:.0}; upload too small",
                grid_width, layout.min_anchor_width
            );
            return SupportRecord::default();
        }
        debug!("support: anchor {:?} score {:.3}", anchor.bbox, anchor.score);
        self.ctx.dump_anchor(NAME, image, &anchor.bbox);

        let current = self.read_row(image, anchor.bbox, &layout.current, None);
        let max = self.read_row(image, anchor.bbox, &layout.max, Some(layout.max_digits));
        debug!(
            "support: {:?} / {:?}",
            Parameters::from_array(current),
            Parameters::from_array(max)
        );
        SupportRecord {
            params: SupportParameters::from_arrays(current, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    const ANCHOR: BoundingBox = BoundingBox {
        start_x: 50.0,
        start_y: 40.0,
        end_x: 650.0,
        end_y: 80.0,
    };

    /// Paint `current[i]` and `max[i]` blocks of `(w, h)` into each box.
    fn screen(layouts: &crate::Layouts, current: &[(u32, u32)], max: &[(u32, u32)]) -> RgbaImage {
        let mut img = canvas(720, 240, BACKGROUND);
        paste(&mut img, &support_frame(), 50, 40);
        let support = &layouts.support;
        for (specs, blocks) in [(&support.current, current), (&support.max, max)] {
            let regions = derive(ANCHOR, specs);
            for (spec, &(w, h)) in specs.iter().zip(blocks) {
                let b = regions[&spec.name];
                mark(
                    &mut img,
                    b.start_x.ceil() as u32 + 2,
                    b.start_y.ceil() as u32 + 2,
                    w,
                    h,
                );
            }
        }
        img
    }

    #[test]
    fn test_reads_current_and_max() {
        let layouts = layouts();
        let img = screen(
            &layouts,
            &[(10, 10), (5, 4), (3, 3), (1, 7), (2, 1)],
            &[(50, 25), (10, 12), (5, 6), (3, 3), (0, 0)],
        );
        let record = SupportExtractor::new(context_with(layouts, FakeOcr::default())).extract(&img);
        let p = record.params;
        assert_eq!(
            [p.speed, p.stamina, p.power, p.guts, p.wise],
            [100, 20, 9, 7, 2]
        );
        // 1250 has one digit too many and loses the first.
        assert_eq!(
            [p.max_speed, p.max_stamina, p.max_power, p.max_guts, p.max_wise],
            [250, 120, 30, 9, 0]
        );
    }

    #[test]
    fn test_small_upload_gives_zeros() {
        let mut layouts = layouts();
        layouts.support.min_anchor_width = 1000.0;
        let img = screen(&layouts, &[(10, 10); 5], &[(5, 5); 5]);
        let record = SupportExtractor::new(context_with(layouts, FakeOcr::default())).extract(&img);
        assert_eq!(record, SupportRecord::default());
    }

    #[test]
    fn test_width_gate_uses_grid_width() {
        // The frame is 600 px; its grid is 606 px.
        let mut layouts = layouts();
        layouts.support.min_anchor_width = 605.0;
        let img = screen(&layouts, &[(10, 10); 5], &[(5, 5); 5]);
        let record = SupportExtractor::new(context_with(layouts.clone(), FakeOcr::default()))
            .extract(&img);
        assert_eq!(record.params.speed, 100);

        layouts.support.min_anchor_width = 607.0;
        let record = SupportExtractor::new(context_with(layouts, FakeOcr::default())).extract(&img);
        assert_eq!(record, SupportRecord::default());
    }

    #[test]
    fn test_missing_frame_gives_zeros() {
        let ctx = context(FakeOcr::default());
        let record = SupportExtractor::new(ctx).extract(&canvas(720, 240, BACKGROUND));
        assert_eq!(record, SupportRecord::default());
    }

    #[test]
    fn test_trim_leading_glyph() {
        assert_eq!(trim_leading_glyph("1250", 3), "250");
        assert_eq!(trim_leading_glyph("250", 3), "250");
        assert_eq!(trim_leading_glyph("", 3), "");
    }
}
