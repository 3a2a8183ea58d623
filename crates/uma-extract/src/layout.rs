//! Screen layouts as data.
//!
//! Every crop box is a [`RegionSpec`] measured in units of the matched anchor, so the same
//! numbers hold for any upload resolution. The defaults describe the current game version;
//! a JSON document of the same shape can replace any part of them.

use serde::{Deserialize, Serialize};
use uma_vision::{Offset, RegionSpec, ScaleRange};

/// How to find an anchor element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    /// Logical path of the template image.
    pub template: String,
    pub scales: ScaleRange,
    /// Resize the template to the working width before matching.
    #[serde(default)]
    pub resize_template: bool,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_min_score() -> f32 {
    uma_vision::matcher::DEFAULT_MIN_SCORE
}

impl AnchorSpec {
    fn new(template: &str, scales: ScaleRange, resize_template: bool) -> Self {
        Self {
            template: template.to_string(),
            scales,
            resize_template,
            min_score: default_min_score(),
        }
    }
}

/// An ordered icon list. Order matters: classification is first-match-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconSetSpec {
    pub dir: String,
    /// `(file name, label)` pairs, highest priority first.
    pub icons: Vec<(String, String)>,
    pub width: u32,
    pub threshold: f32,
}

impl IconSetSpec {
    fn new(dir: &str, icons: &[(&str, &str)], width: u32, threshold: f32) -> Self {
        Self {
            dir: dir.to_string(),
            icons: icons
                .iter()
                .map(|(f, l)| (f.to_string(), l.to_string()))
                .collect(),
            width,
            threshold,
        }
    }
}

/// Resize-and-crop applied to a character detail upload before matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub working_width: u32,
    /// Kept vertical band as fractions of the height.
    pub band: (f64, f64),
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            working_width: uma_vision::preprocess::WORKING_WIDTH,
            band: (0.1, 0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterLayout {
    pub normalization: Normalization,
    pub anchor: AnchorSpec,
    pub name: RegionSpec,
    pub nickname: RegionSpec,
    pub rank: RegionSpec,
    /// Per-channel border for the name plate's color threshold.
    pub name_border: [u8; 3],
    pub nickname_border: [u8; 3],
    pub lang: String,
    pub nickname_floor: f64,
    pub ranks: IconSetSpec,
}

impl Default for CharacterLayout {
    fn default() -> Self {
        Self {
            normalization: Normalization::default(),
            anchor: AnchorSpec::new(
                "templates/params_frame.png",
                ScaleRange::new(1.1, 1.5, 10),
                true,
            ),
            name: RegionSpec::new("name", 0.5, -5.25, 0.95, -4.15),
            nickname: RegionSpec::new("nickname", 0.5, -6.3, 0.95, -5.3),
            rank: RegionSpec::new("rank", 0.325, -7.0, 0.485, -3.4),
            name_border: [150, 150, 150],
            nickname_border: [150, 150, 150],
            lang: "jpn".to_string(),
            nickname_floor: uma_data::NICKNAME_FLOOR,
            ranks: IconSetSpec::new(
                "templates/ranks",
                &[
                    ("s_plus.png", "S+"),
                    ("s.png", "S"),
                    ("a_plus.png", "A+"),
                    ("a.png", "A"),
                    ("b_plus.png", "B+"),
                    ("b.png", "B"),
                    ("c_plus.png", "C+"),
                    ("c.png", "C"),
                    ("d_plus.png", "D+"),
                    ("d.png", "D"),
                    ("e_plus.png", "E+"),
                    ("e.png", "E"),
                    ("f_plus.png", "F+"),
                    ("f.png", "F"),
                    ("g_plus.png", "G+"),
                ],
                120,
                0.8,
            ),
        }
    }
}

/// Grade columns are 0.2 anchor widths apart, each 0.055 wide.
fn grade_cell(name: &str, column: usize, y0: f64, y1: f64) -> RegionSpec {
    let x0 = 0.315 + 0.2 * column as f64;
    RegionSpec::new(name, x0, y0, x0 + 0.055, y1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityLayout {
    pub normalization: Normalization,
    pub anchor: AnchorSpec,
    /// `turf`, `dirt`
    pub fields: Vec<RegionSpec>,
    /// `short`, `miles`, `medium`, `long`
    pub distances: Vec<RegionSpec>,
    /// `first`, `half_first`, `half_last`, `last`
    pub strategies: Vec<RegionSpec>,
    pub grades: IconSetSpec,
}

impl Default for AbilityLayout {
    fn default() -> Self {
        let row = |names: &[&str], y0: f64, y1: f64| -> Vec<RegionSpec> {
            names
                .iter()
                .enumerate()
                .map(|(i, n)| grade_cell(n, i, y0, y1))
                .collect()
        };
        Self {
            normalization: Normalization::default(),
            anchor: AnchorSpec::new(
                "templates/params_frame.png",
                ScaleRange::new(1.1, 1.5, 10),
                true,
            ),
            fields: row(&["turf", "dirt"], 3.8, 5.2),
            distances: row(&["short", "miles", "medium", "long"], 5.35, 6.75),
            strategies: row(&["first", "half_first", "half_last", "last"], 6.9, 8.3),
            grades: IconSetSpec::new(
                "templates/ability",
                &[
                    ("s.png", "S"),
                    ("a.png", "A"),
                    ("b.png", "B"),
                    ("c.png", "C"),
                    ("d.png", "D"),
                    ("e.png", "E"),
                    ("f.png", "F"),
                    ("g.png", "G"),
                ],
                38,
                0.9,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLayout {
    pub normalization: Normalization,
    pub anchor: AnchorSpec,
    /// `speed`, `stamina`, `power`, `guts`, `wise`, left to right.
    pub params: Vec<RegionSpec>,
    pub threshold: u8,
}

impl Default for StatusLayout {
    fn default() -> Self {
        // Five equal columns below the frame, two frame heights tall. The digits sit right
        // of the stat label.
        let params = uma_state::Parameters::NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let i = i as f64;
                RegionSpec::new(*n, 0.2 * i + 0.073, 1.0, 0.2 * (i + 1.0) - 0.01, 3.0)
            })
            .collect();
        Self {
            normalization: Normalization::default(),
            anchor: AnchorSpec::new(
                "templates/params_frame.png",
                ScaleRange::new(1.1, 1.5, 3),
                true,
            ),
            params,
            threshold: 210,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillLayout {
    pub working_width: u32,
    pub band: (f64, f64),
    pub tab: AnchorSpec,
    /// Bottom of the skill list in skill-tab heights from the top of the working image.
    pub area_rows: f64,
    pub frame_template: String,
    pub frame_scales: ScaleRange,
    pub frame_threshold: f32,
    pub suppression: (f64, f64),
    /// Row-relative boxes in skill-tab units.
    pub name: RegionSpec,
    pub level: RegionSpec,
    /// Binarization thresholds tried in order until a name is recognized.
    pub name_thresholds: Vec<u8>,
    pub lang: String,
    pub glyph_width: f64,
    pub weight_tolerance: u32,
    pub circle_threshold: u8,
    pub circle_glyph_width: f64,
    pub circle_margin: f64,
    pub circles: IconSetSpec,
}

impl Default for SkillLayout {
    fn default() -> Self {
        Self {
            working_width: uma_vision::preprocess::WORKING_WIDTH,
            band: (0.4, 0.95),
            tab: AnchorSpec::new("templates/skill_tab.png", ScaleRange::new(1.1, 1.5, 3), false),
            area_rows: 20.0,
            frame_template: "templates/skill_frame.png".to_string(),
            frame_scales: ScaleRange::new(1.0, 1.1, 3),
            frame_threshold: 0.7,
            suppression: (100.0, 80.0),
            name: RegionSpec::with_offsets(
                "name",
                Offset::start(0.07),
                Offset::start(0.7),
                Offset::start(0.435),
                Offset::end(-0.55),
            ),
            level: RegionSpec::with_offsets(
                "level",
                Offset::start(0.435),
                Offset::start(0.7),
                Offset::start(0.5),
                Offset::end(-0.6),
            ),
            name_thresholds: vec![130, 140, 160],
            lang: "jpn".to_string(),
            glyph_width: uma_data::reconcile::DEFAULT_GLYPH_WIDTH,
            weight_tolerance: 0,
            circle_threshold: 160,
            circle_glyph_width: 25.3,
            circle_margin: 2.0,
            circles: IconSetSpec::new(
                "templates/circles",
                &[("single.png", "◯"), ("double.png", "◎")],
                25,
                0.6,
            ),
        }
    }
}

const SUPPORT_GRID_SCALE: f64 = 1.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportLayout {
    pub anchor: AnchorSpec,
    /// Stat grid width in anchor widths.
    pub grid_scale: f64,
    /// Grids (anchor width times `grid_scale`) narrower than this come from uploads too
    /// small to read.
    pub min_anchor_width: f64,
    pub current: Vec<RegionSpec>,
    pub max: Vec<RegionSpec>,
    pub threshold: u8,
    /// Longer maximum values carry a misread leading glyph.
    pub max_digits: usize,
}

impl Default for SupportLayout {
    fn default() -> Self {
        // Columns are laid out on a grid 1.01 anchor widths wide, rows on 1.05 anchor
        // heights. The speed column starts a little further left.
        let col = SUPPORT_GRID_SCALE / 5.0;
        let row = 1.05;
        let speed_shift = SUPPORT_GRID_SCALE * 0.015;
        let mut current = Vec::new();
        let mut max = Vec::new();
        for (i, n) in uma_state::Parameters::NAMES.iter().enumerate() {
            let i = i as f64;
            let shift = if i == 0.0 { speed_shift } else { 0.0 };
            current.push(RegionSpec::new(
                *n,
                col * i + col * 0.38 - shift,
                1.0,
                col * (i + 1.0),
                1.0 + row * 1.05,
            ));
            max.push(RegionSpec::new(
                format!("max_{n}"),
                col * i + col * 0.5 - shift,
                1.0 + row,
                col * (i + 1.0),
                1.0 + row * 1.9,
            ));
        }
        Self {
            anchor: AnchorSpec::new(
                "templates/support_params_frame.png",
                ScaleRange::new(1.0, 2.5, 10),
                false,
            ),
            grid_scale: SUPPORT_GRID_SCALE,
            min_anchor_width: 400.0,
            current,
            max,
            threshold: 210,
            max_digits: 3,
        }
    }
}

/// All screen layouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layouts {
    pub character: CharacterLayout,
    pub ability: AbilityLayout,
    pub status: StatusLayout,
    pub skill: SkillLayout,
    pub support: SupportLayout,
}

impl Layouts {
    /// Parse a layout document; anything it leaves out keeps its default.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        use anyhow::Context;
        serde_json::from_slice(bytes).context("Failed to parse layout document")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uma_vision::{derive, BoundingBox};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_status_speed_box() {
        let layout = StatusLayout::default();
        let anchor = BoundingBox::new(47.0, 724.0, 1123.0, 765.0);
        let regions = derive(anchor, &layout.params);
        let speed = regions["speed"];
        assert!(approx(speed.start_x, 47.0 + 0.073 * 1076.0));
        assert!(approx(speed.start_y, 765.0));
        assert!(approx(speed.end_x, 47.0 + 0.19 * 1076.0));
        assert!(approx(speed.end_y, 724.0 + 3.0 * 41.0));
        assert_eq!(regions.len(), 5);
    }

    #[test]
    fn test_support_boxes_follow_grid() {
        let layout = SupportLayout::default();
        let anchor = BoundingBox::new(0.0, 0.0, 1000.0, 100.0);
        let current = derive(anchor, &layout.current);
        let max = derive(anchor, &layout.max);
        // w = 1010, p = 202, lo = 76.76, o = 15.15, h = 105
        assert!(approx(current["stamina"].start_x, 202.0 + 76.76));
        assert!(approx(current["speed"].start_x, 76.76 - 15.15));
        assert!(approx(current["wise"].end_x, 1010.0));
        assert!(approx(current["speed"].end_y, 100.0 + 105.0 * 1.05));
        assert!(approx(max["max_guts"].start_x, 606.0 + 101.0));
        assert!(approx(max["max_guts"].start_y, 205.0));
        assert!(approx(max["max_guts"].end_y, 100.0 + 105.0 * 1.9));
    }

    #[test]
    fn test_ability_cells() {
        let layout = AbilityLayout::default();
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.distances.len(), 4);
        assert_eq!(layout.strategies[3].name, "last");
        assert!(approx(layout.distances[3].x0.factor, 0.915));
        assert!(approx(layout.distances[3].x1.factor, 0.97));
    }

    #[test]
    fn test_rank_order_is_highest_first() {
        let layout = CharacterLayout::default();
        let labels: Vec<&str> = layout.ranks.icons.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels.len(), 15);
        assert_eq!(&labels[..3], &["S+", "S", "A+"]);
        assert_eq!(labels.last(), Some(&"G+"));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let json = br#"{
            "status": {"threshold": 200},
            "skill": {"name_thresholds": [120, 150]}
        }"#;
        let layouts = Layouts::from_json(json).unwrap();
        assert_eq!(layouts.status.threshold, 200);
        assert_eq!(layouts.status.params, StatusLayout::default().params);
        assert_eq!(layouts.skill.name_thresholds, vec![120, 150]);
        assert_eq!(layouts.skill.frame_threshold, 0.7);
        assert_eq!(layouts.character, CharacterLayout::default());
    }

    #[test]
    fn test_layout_round_trips_through_json() {
        let layouts = Layouts::default();
        let json = serde_json::to_vec(&layouts).unwrap();
        assert_eq!(Layouts::from_json(&json).unwrap(), layouts);
    }
}
