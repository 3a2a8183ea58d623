//! Skill list reader.
//!
//! The skill tab anchors a scrollable two-column list of row frames. Every frame found
//! by the repeated-element search is read independently; rows run in parallel on the
//! rayon pool and come back in reading order.

use crate::context::ExtractContext;
use crate::Extractor;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, RgbaImage};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};
use uma_data::Vocabulary;
use uma_state::{CharacterSkills, Skill};
use uma_vision::preprocess::{binarize, crop_band, grayscale, resize_to_width};
use uma_vision::{crop, Anchor, BoundingBox, RepeatedElementLocator};

const NAME: &str = "skill";
const SINGLE_CIRCLE: char = '◯';

pub struct SkillExtractor {
    ctx: Arc<ExtractContext>,
}

impl SkillExtractor {
    pub fn new(ctx: Arc<ExtractContext>) -> Self {
        Self { ctx }
    }

    /// Every row in reading order, before the unique skill is split off.
    pub fn rows(&self, image: &RgbaImage) -> Vec<Skill> {
        let layout = &self.ctx.layouts.skill;
        let resized = resize_to_width(image, layout.working_width, FilterType::CatmullRom);
        let working = crop_band(&resized, layout.band.0, layout.band.1);

        let Some(tab) = self.ctx.assets.skill_tab.locate(&working) else {
            info!("skill: skill tab not found");
            return Vec::new();
        };
        self.ctx.dump_anchor(NAME, &working, &tab.bbox);
        let (unit_w, unit_h) = (tab.bbox.width(), tab.bbox.height());
        let bottom = (layout.area_rows * unit_h).min(working.height() as f64);
        let area_box = BoundingBox::new(0.0, tab.bbox.end_y, working.width() as f64, bottom);
        let Some(area) = crop(&working, &area_box) else {
            debug!("skill: empty list area below tab {:?}", tab.bbox);
            return Vec::new();
        };
        self.ctx
            .dump(NAME, "area.png", || DynamicImage::ImageRgba8(area.clone()));

        let frames = RepeatedElementLocator::new(layout.suppression.0, layout.suppression.1)
            .locate_all(
                &grayscale(&area),
                &self.ctx.assets.skill_frame,
                layout.frame_scales,
                layout.frame_threshold,
            );
        info!("skill: {} rows", frames.len());

        frames
            .par_iter()
            .enumerate()
            .map(|(index, frame)| {
                self.read_row(&area, index, Anchor::with_unit(*frame, unit_w, unit_h))
            })
            .collect()
    }

    fn read_row(&self, area: &RgbaImage, index: usize, row: Anchor) -> Skill {
        let layout = &self.ctx.layouts.skill;
        let Some(cropped) = crop(area, &row.derive_one(&layout.name)) else {
            return Skill::default();
        };

        let mut name = String::new();
        for &threshold in &layout.name_thresholds {
            let binary = binarize(&cropped, threshold);
            self.ctx
                .dump(NAME, &format!("skill{}_name_{}.png", index + 1, threshold), || {
                    DynamicImage::ImageLuma8(binary.clone())
                });
            if let Some(found) = self.recognize_name(&binary) {
                name = found;
                break;
            }
        }
        if name.contains(SINGLE_CIRCLE) {
            name = self.resolve_circle(&cropped, name);
        }

        // Only the first row (the unique skill slot) shows a level.
        let level = match layout.name_thresholds.first() {
            Some(&threshold) if index == 0 => self.ctx.read_number(
                area,
                &row.derive_one(&layout.level),
                threshold,
                NAME,
                "level",
            ),
            _ => 0,
        };
        debug!("skill: row {} = '{}' level {}", index, name, level);
        Skill::new(name, level)
    }

    /// First recognized line, reconciled within its width class.
    fn recognize_name(&self, binary: &GrayImage) -> Option<String> {
        let layout = &self.ctx.layouts.skill;
        let lines = self.ctx.ocr.recognize_line_boxes(binary, &layout.lang);
        let first = lines.first()?;
        self.ctx
            .reconciler
            .reconcile(
                &first.content,
                first.bbox.width(),
                &self.ctx.master.skills,
                layout.weight_tolerance,
            )
            .map(|r| r.name)
    }

    /// Names differing only in a trailing ◯ or ◎ reconcile to the ◯ form; the glyph right
    /// of the recognized line decides which one is shown.
    fn resolve_circle(&self, cropped: &RgbaImage, name: String) -> String {
        let layout = &self.ctx.layouts.skill;
        let binary = binarize(cropped, layout.circle_threshold);
        let lines = self.ctx.ocr.recognize_line_boxes(&binary, &layout.lang);
        let Some(line) = lines.first() else {
            return name;
        };
        let m = layout.circle_margin;
        let glyph_box = BoundingBox::new(
            line.bbox.end_x - layout.circle_glyph_width,
            line.bbox.start_y - m,
            line.bbox.end_x + m,
            line.bbox.end_y + m,
        );
        let Some(glyph) = crop(&binary, &glyph_box) else {
            return name;
        };
        match self
            .ctx
            .assets
            .circles
            .classify_gray(&glyph, layout.circles.threshold)
        {
            Some(label) => replace_circle(&name, label),
            None => name,
        }
    }
}

fn replace_circle(name: &str, label: &str) -> String {
    name.replace(SINGLE_CIRCLE, label)
}

/// The first row naming a unique skill with a level is the unique skill; everything
/// else, in order, is a normal skill.
pub fn split_unique(rows: Vec<Skill>, vocabulary: &Vocabulary) -> CharacterSkills {
    let unique_at = rows
        .iter()
        .position(|s| s.level > 0 && vocabulary.is_unique(&s.name));
    let mut skills = CharacterSkills::default();
    for (i, skill) in rows.into_iter().enumerate() {
        if Some(i) == unique_at {
            skills.unique_skill = skill;
        } else {
            skills.normal_skills.push(skill);
        }
    }
    skills
}

impl Extractor for SkillExtractor {
    type Record = CharacterSkills;

    fn extract(&self, image: &RgbaImage) -> CharacterSkills {
        split_unique(self.rows(image), &self.ctx.master.skills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    const TAB: (u32, u32) = (20, 20);

    /// Frame positions inside the list area, i.e. below the tab.
    const FRAMES: [(u32, u32); 3] = [(10, 20), (210, 24), (10, 100)];

    fn screen(marks: &[(u32, u32)], level: Option<u32>) -> RgbaImage {
        let mut img = canvas(400, 300, 100);
        paste(&mut img, &skill_tab(), TAB.0 as i64, TAB.1 as i64);
        let area_top = TAB.1 + 20;
        for (i, &(fx, fy)) in FRAMES.iter().enumerate() {
            let (x, y) = (fx, area_top + fy);
            paste(&mut img, &skill_frame(), x as i64, y as i64);
            // Name box starts 0.07 x 80 = 5.6 px in and 0.7 x 20 = 14 px down.
            if let Some(&(w, h)) = marks.get(i) {
                mark(&mut img, x + 8, y + 17, w, h);
            }
            if i == 0 {
                if let Some(n) = level {
                    // Level box spans 34.8..40 px across.
                    mark(&mut img, x + 36, y + 18, 1, n);
                }
            }
        }
        img
    }

    fn ocr() -> FakeOcr {
        FakeOcr::default()
            .line(12, "シューティンクスター", BoundingBox::new(0.0, 0.0, 260.0, 20.0))
            .line(15, "弧線のプロフエッサー", BoundingBox::new(0.0, 0.0, 235.0, 20.0))
            .line(18, "直線功者", BoundingBox::new(0.0, 0.0, 105.0, 20.0))
    }

    #[test]
    fn test_rows_in_reading_order() {
        let extractor = SkillExtractor::new(context(ocr()));
        let rows = extractor.rows(&screen(&[(4, 3), (5, 3), (6, 3)], Some(4)));
        assert_eq!(
            rows,
            vec![
                Skill::new("シューティングスター", 4),
                Skill::new("弧線のプロフェッサー", 0),
                Skill::new("直線巧者", 0),
            ]
        );
    }

    #[test]
    fn test_unique_split() {
        let extractor = SkillExtractor::new(context(ocr()));
        let skills = extractor.extract(&screen(&[(4, 3), (5, 3), (6, 3)], Some(4)));
        assert_eq!(skills.unique_skill, Skill::new("シューティングスター", 4));
        assert_eq!(
            skills.normal_skills,
            vec![Skill::new("弧線のプロフェッサー", 0), Skill::new("直線巧者", 0)]
        );
    }

    #[test]
    fn test_unique_needs_a_level() {
        let extractor = SkillExtractor::new(context(ocr()));
        let skills = extractor.extract(&screen(&[(4, 3), (5, 3), (6, 3)], None));
        assert_eq!(skills.unique_skill, Skill::default());
        assert_eq!(skills.normal_skills.len(), 3);
        assert_eq!(skills.normal_skills[0], Skill::new("シューティングスター", 0));
    }

    #[test]
    fn test_unreadable_row_keeps_its_place() {
        let extractor = SkillExtractor::new(context(ocr()));
        let rows = extractor.rows(&screen(&[(4, 3), (9, 9), (6, 3)], None));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], Skill::default());
        assert_eq!(rows[2].name, "直線巧者");
    }

    #[test]
    fn test_list_bottom_counts_from_image_top() {
        // 8 tab heights is y = 160: the third frame (y 140..180) no longer fits.
        let mut layouts = layouts();
        layouts.skill.area_rows = 8.0;
        let extractor = SkillExtractor::new(context_with(layouts, ocr()));
        let rows = extractor.rows(&screen(&[(4, 3), (5, 3), (6, 3)], Some(4)));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "弧線のプロフェッサー");
    }

    #[test]
    fn test_list_above_tab_bottom_is_empty() {
        let mut layouts = layouts();
        layouts.skill.area_rows = 1.5;
        let extractor = SkillExtractor::new(context_with(layouts, ocr()));
        assert!(extractor.rows(&screen(&[(4, 3)], None)).is_empty());
    }

    #[test]
    fn test_no_tab_no_skills() {
        let extractor = SkillExtractor::new(context(ocr()));
        let skills = extractor.extract(&canvas(400, 300, 100));
        assert_eq!(skills, CharacterSkills::default());
    }

    #[test]
    fn test_circle_glyph_replaces_single_circle() {
        let layouts = layouts();
        let double = icon_for(&layouts, &layouts.skill.circles.dir, "◎");
        // The glyph sits at the right end of the recognized line.
        let mut cropped = canvas(100, 32, 0);
        paste(&mut cropped, &double, 68, 6);
        let white = white_pixels(&binarize(&cropped, layouts.skill.circle_threshold));
        let ocr = FakeOcr::default().line(white, "右回り◯", BoundingBox::new(10.0, 6.0, 90.0, 26.0));
        let extractor = SkillExtractor::new(context_with(layouts, ocr));
        assert_eq!(extractor.resolve_circle(&cropped, "右回り◯".into()), "右回り◎");
    }

    #[test]
    fn test_circle_kept_without_line() {
        let extractor = SkillExtractor::new(context(FakeOcr::default()));
        let cropped = canvas(100, 32, 0);
        assert_eq!(extractor.resolve_circle(&cropped, "右回り◯".into()), "右回り◯");
    }

    #[test]
    fn test_replace_circle() {
        assert_eq!(replace_circle("コーナー回復◯", "◎"), "コーナー回復◎");
        assert_eq!(replace_circle("直線巧者", "◎"), "直線巧者");
    }
}
