use crate::ncc::{match_template, PreparedTemplate, ScoreMap};
use crate::region::BoundingBox;
use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum best score for an anchor to count as present.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Best anchor placement found by [`MultiScaleMatcher::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Box in the coordinates of the image that was searched.
    pub bbox: BoundingBox,
    pub score: f32,
    /// `original_width / resized_width` at the winning scale.
    pub scale_ratio: f64,
}

/// Linearly spaced scale factors `start..=end` with `steps` samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

impl ScaleRange {
    pub const fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }

    /// A single fixed scale.
    pub const fn fixed(scale: f64) -> Self {
        Self::new(scale, scale, 1)
    }

    /// Factors in ascending order.
    pub fn factors(&self) -> Vec<f64> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = (self.end - self.start) / (n - 1) as f64;
                (0..n).map(|i| self.start + step * i as f64).collect()
            }
        }
    }
}

/// Score map produced at one tested scale.
#[derive(Debug, Clone)]
pub struct ScaledScores {
    pub scale: f64,
    pub ratio: f64,
    pub scores: ScoreMap,
}

/// Finds a fixed-size template inside an image whose display scale is unknown by
/// resizing the search image through a range of factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiScaleMatcher {
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

impl Default for MultiScaleMatcher {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl MultiScaleMatcher {
    pub fn with_min_score(min_score: f32) -> Self {
        Self { min_score }
    }

    /// Correlate at every factor, largest first. Stops at the first factor where the
    /// resized image can no longer contain the template.
    pub fn scan(
        &self,
        image: &GrayImage,
        template: &PreparedTemplate,
        range: ScaleRange,
    ) -> Vec<ScaledScores> {
        let (w, h) = image.dimensions();
        let mut out = Vec::new();
        for scale in range.factors().into_iter().rev() {
            let rw = ((w as f64) * scale).round() as u32;
            let rh = ((h as f64) * scale).round() as u32;
            if rw < template.width() || rh < template.height() || rw == 0 || rh == 0 {
                debug!(
                    "scale {:.3}: image {}x{} smaller than template {}x{}, stopping",
                    scale,
                    rw,
                    rh,
                    template.width(),
                    template.height()
                );
                break;
            }
            let resized = if (rw, rh) == (w, h) {
                image.clone()
            } else {
                imageops::resize(image, rw, rh, FilterType::Triangle)
            };
            if let Some(scores) = match_template(&resized, template) {
                out.push(ScaledScores {
                    scale,
                    ratio: w as f64 / rw as f64,
                    scores,
                });
            }
        }
        out
    }

    /// Best single placement of `template` across `range`, in `image` coordinates.
    pub fn locate(
        &self,
        image: &GrayImage,
        template: &PreparedTemplate,
        range: ScaleRange,
    ) -> Option<MatchResult> {
        let mut best: Option<(u32, u32, f32, f64)> = None;
        for scaled in self.scan(image, template, range) {
            let Some((x, y, score)) = scaled.scores.max_location() else {
                continue;
            };
            debug!("scale {:.3}: best {:.3} at ({}, {})", scaled.scale, score, x, y);
            if best.map_or(true, |(_, _, b, _)| score > b) {
                best = Some((x, y, score, scaled.ratio));
            }
        }

        let (x, y, score, ratio) = best?;
        if score < self.min_score {
            debug!("best score {:.3} below floor {:.3}", score, self.min_score);
            return None;
        }
        let bbox = BoundingBox::new(
            x as f64 * ratio,
            y as f64 * ratio,
            (x + template.width()) as f64 * ratio,
            (y + template.height()) as f64 * ratio,
        );
        Some(MatchResult {
            bbox,
            score,
            scale_ratio: ratio,
        })
    }
}
