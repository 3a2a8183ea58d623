use crate::matcher::{MultiScaleMatcher, ScaleRange};
use crate::ncc::PreparedTemplate;
use crate::region::BoundingBox;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Finds every occurrence of a repeating template (one skill row frame, say) and
/// returns them in two-column reading order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepeatedElementLocator {
    /// Suppression window `(dx, dy)` in resized-image pixels. A candidate closer than
    /// this on both axes to its nearest accepted point is the same element.
    pub window: (f64, f64),
}

impl Default for RepeatedElementLocator {
    fn default() -> Self {
        Self {
            window: (100.0, 80.0),
        }
    }
}

impl RepeatedElementLocator {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { window: (dx, dy) }
    }

    pub fn locate_all(
        &self,
        image: &GrayImage,
        template: &PreparedTemplate,
        range: ScaleRange,
        score_threshold: f32,
    ) -> Vec<BoundingBox> {
        let (tw, th) = (template.width() as f64, template.height() as f64);
        // Accepted points in original-image coordinates.
        let mut accepted: Vec<(f64, f64)> = Vec::new();
        let mut boxes = Vec::new();

        for scaled in MultiScaleMatcher::default().scan(image, template, range) {
            let r = scaled.ratio;
            for (x, y, score) in scaled.scores.above(score_threshold) {
                let (px, py) = (x as f64, y as f64);
                if self.is_duplicate(&accepted, px, py, r) {
                    continue;
                }
                debug!(
                    "scale {:.3}: element {} at ({}, {}) score {:.3}",
                    scaled.scale,
                    boxes.len(),
                    x,
                    y,
                    score
                );
                accepted.push((px * r, py * r));
                boxes.push(BoundingBox::new(px * r, py * r, (px + tw) * r, (py + th) * r));
            }
        }

        sort_reading_order(&mut boxes);
        boxes
    }

    /// `(x, y)` is in the resized space of a scan whose ratio is `ratio`; accepted points
    /// are projected into that space before comparing.
    fn is_duplicate(&self, accepted: &[(f64, f64)], x: f64, y: f64, ratio: f64) -> bool {
        let projected = accepted.iter().map(|&(ax, ay)| (ax / ratio, ay / ratio));
        let nearest = projected.min_by(|a, b| {
            let da = (a.0 - x).powi(2) + (a.1 - y).powi(2);
            let db = (b.0 - x).powi(2) + (b.1 - y).powi(2);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        });
        match nearest {
            Some((nx, ny)) => (nx - x).abs() < self.window.0 && (ny - y).abs() < self.window.1,
            None => false,
        }
    }
}

/// Sort top-to-bottom, then put each consecutive pair left-before-right.
///
/// The layout is a two-column grid whose columns are not perfectly aligned vertically,
/// so a plain `(y, x)` sort would interleave them wrongly.
pub fn sort_reading_order(boxes: &mut [BoundingBox]) {
    boxes.sort_by(|a, b| a.start_y.partial_cmp(&b.start_y).unwrap_or(Ordering::Equal));
    for pair in boxes.chunks_exact_mut(2) {
        if pair[0].start_x > pair[1].start_x {
            pair.swap(0, 1);
        }
    }
}
