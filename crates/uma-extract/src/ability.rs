use crate::context::{normalize, ExtractContext};
use crate::Extractor;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, info};
use uma_state::{Abilities, DistanceAbilities, FieldAbilities, StrategyAbilities};
use uma_vision::{crop, BoundingBox, RegionSpec};

const NAME: &str = "ability";

/// Grade letters for track surface, distance and running strategy aptitudes.
pub struct AbilityExtractor {
    ctx: Arc<ExtractContext>,
}

impl AbilityExtractor {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx }
    }

    pub fn fields(&self, image: &RgbaImage) -> FieldAbilities {
        let Some((working, anchor)) = self.anchor(image) else {
            return FieldAbilities::default();
        };
        self.read_fields(&working, anchor)
    }

    pub fn distances(&self, image: &RgbaImage) -> DistanceAbilities {
        let Some((working, anchor)) = self.anchor(image) else {
            return DistanceAbilities::default();
        };
        self.read_distances(&working, anchor)
    }

    pub fn strategies(&self, image: &RgbaImage) -> StrategyAbilities {
        let Some((working, anchor)) = self.anchor(image) else {
            return StrategyAbilities::default();
        };
        self.read_strategies(&working, anchor)
    }

    fn anchor(&self, image: &RgbaImage) -> Option<(RgbaImage, BoundingBox)> {
        let working = normalize(image, &self.ctx.layouts.ability.normalization);
        match self.ctx.assets.ability_anchor.locate(&working) {
            Some(m) => {
                debug!("ability: anchor {:?} score {:.3}", m.bbox, m.score);
                self.ctx.dump_anchor(NAME, &working, &m.bbox);
                Some((working, m.bbox))
            }
            None => {
                info!("ability: parameter frame not found");
                None
            }
        }
    }

    fn read_fields(&self, working: &RgbaImage, anchor: BoundingBox) -> FieldAbilities {
        let [turf, dirt] = self.grades(working, anchor, &self.ctx.layouts.ability.fields);
        FieldAbilities { turf, dirt }
    }

    fn read_distances(&self, working: &RgbaImage, anchor: BoundingBox) -> DistanceAbilities {
        let [short, miles, medium, long] =
            self.grades(working, anchor, &self.ctx.layouts.ability.distances);
        DistanceAbilities {
            short,
            miles,
            medium,
            long,
        }
    }

    fn read_strategies(&self, working: &RgbaImage, anchor: BoundingBox) -> StrategyAbilities {
        let [first, half_first, half_last, last] =
            self.grades(working, anchor, &self.ctx.layouts.ability.strategies);
        StrategyAbilities {
            first,
            half_first,
            half_last,
            last,
        }
    }

    /// One grade per cell, in cell order. Missing cells read as empty.
    fn grades<const N: usize>(
        &self,
        working: &RgbaImage,
        anchor: BoundingBox,
        cells: &[RegionSpec],
    ) -> [String; N] {
        let anchor = uma_vision::Anchor::from(anchor);
        let threshold = self.ctx.layouts.ability.grades.threshold;
        std::array::from_fn(|i| {
            let Some(spec) = cells.get(i) else {
                return String::new();
            };
            let Some(cell) = crop(working, &anchor.derive_one(spec)) else {
                return String::new();
            };
            self.ctx
                .dump(NAME, &format!("{}.png", spec.name), || {
                    DynamicImage::ImageRgba8(cell.clone())
                });
            let grade = self
                .ctx
                .assets
                .grades
                .classify(&cell, threshold)
                .unwrap_or_default()
                .to_string();
            debug!("ability: {} = '{}'", spec.name, grade);
            grade
        })
    }
}

impl Extractor for AbilityExtractor {
    type Record = Abilities;

    fn extract(&self, image: &RgbaImage) -> Abilities {
        let Some((working, anchor)) = self.anchor(image) else {
            return Abilities::default();
        };
        Abilities {
            fields: self.read_fields(&working, anchor),
            distances: self.read_distances(&working, anchor),
            strategies: self.read_strategies(&working, anchor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use uma_vision::derive;

    fn screen(grades: &[(&str, &str)]) -> (Arc<ExtractContext>, RgbaImage) {
        let layouts = layouts();
        let mut img = canvas(800, 500, BACKGROUND);
        paste(&mut img, &params_frame(), 100, 50);
        let ability = &layouts.ability;
        let cells: Vec<RegionSpec> = ability
            .fields
            .iter()
            .chain(&ability.distances)
            .chain(&ability.strategies)
            .cloned()
            .collect();
        let regions = derive(BoundingBox::new(100.0, 50.0, 700.0, 90.0), &cells);
        for (cell, label) in grades {
            let b = regions[*cell];
            let glyph = icon_for(&layouts, &ability.grades.dir, label);
            paste(
                &mut img,
                &glyph,
                b.start_x.ceil() as i64 + 4,
                b.start_y.ceil() as i64 + 6,
            );
        }
        (context_with(layouts, FakeOcr::default()), img)
    }

    #[test]
    fn test_reads_grades_per_cell() {
        let (ctx, img) = screen(&[("turf", "A"), ("long", "S"), ("first", "G"), ("last", "C")]);
        let abilities = AbilityExtractor::new(ctx).extract(&img);
        assert_eq!(abilities.fields.turf, "A");
        assert_eq!(abilities.fields.dirt, "");
        assert_eq!(abilities.distances.long, "S");
        assert_eq!(abilities.distances.short, "");
        assert_eq!(abilities.strategies.first, "G");
        assert_eq!(abilities.strategies.last, "C");
    }

    #[test]
    fn test_group_accessors_match_extract() {
        let (ctx, img) = screen(&[("dirt", "B"), ("miles", "E")]);
        let extractor = AbilityExtractor::new(ctx);
        assert_eq!(extractor.fields(&img).dirt, "B");
        assert_eq!(extractor.distances(&img).miles, "E");
        assert_eq!(extractor.strategies(&img), StrategyAbilities::default());
    }

    #[test]
    fn test_no_frame_gives_empty_grades() {
        let ctx = context(FakeOcr::default());
        let img = canvas(800, 500, BACKGROUND);
        assert_eq!(AbilityExtractor::new(ctx).extract(&img), Abilities::default());
    }
}
