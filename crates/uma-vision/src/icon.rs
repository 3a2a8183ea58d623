use crate::ncc::{match_template, PreparedTemplate};
use crate::preprocess::resize_gray_to_width;
use image::{GrayImage, RgbaImage};
use tracing::debug;

struct Icon {
    label: String,
    template: PreparedTemplate,
}

/// Ordered list of small reference icons (rank letters, grade letters, circle glyphs).
///
/// Classification is first-match-wins: the first icon in list order whose score map
/// reaches the threshold anywhere is the answer, even if a later icon scores higher.
/// Visually adjacent icons (S and S+) are told apart purely by this order.
pub struct IconClassifier {
    icons: Vec<Icon>,
}

impl IconClassifier {
    /// Every icon is resized to `icon_width` (aspect kept) once, up front.
    pub fn new<L: Into<String>>(
        icon_width: u32,
        icons: impl IntoIterator<Item = (L, GrayImage)>,
    ) -> Self {
        let icons = icons
            .into_iter()
            .map(|(label, gray)| Icon {
                label: label.into(),
                template: PreparedTemplate::new(&resize_gray_to_width(&gray, icon_width)),
            })
            .collect();
        Self { icons }
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn classify(&self, region: &RgbaImage, threshold: f32) -> Option<&str> {
        self.classify_gray(&image::imageops::grayscale(region), threshold)
    }

    pub fn classify_gray(&self, region: &GrayImage, threshold: f32) -> Option<&str> {
        for icon in &self.icons {
            let Some(scores) = match_template(region, &icon.template) else {
                continue;
            };
            if scores.any_above(threshold) {
                debug!("icon '{}' matched at threshold {:.2}", icon.label, threshold);
                return Some(icon.label.as_str());
            }
        }
        None
    }
}
