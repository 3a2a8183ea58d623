//! Maps noisy OCR strings onto a closed vocabulary with Jaro-Winkler similarity.

use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use tracing::debug;

/// Average rendered width of one skill-name glyph in working-image pixels.
pub const DEFAULT_GLYPH_WIDTH: f64 = 25.5;

/// Minimum similarity for optional fields such as nicknames.
pub const NICKNAME_FLOOR: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciled {
    pub name: String,
    pub score: f64,
}

/// Resolves OCR output to vocabulary entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextReconciler {
    pub glyph_width: f64,
}

impl Default for TextReconciler {
    fn default() -> Self {
        Self {
            glyph_width: DEFAULT_GLYPH_WIDTH,
        }
    }
}

/// OCR engines pad CJK text with spaces; the vocabulary has none.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

impl TextReconciler {
    /// Width class of a measured text span: `floor(width / glyph + 1)`.
    pub fn weight_class(&self, measured_width: f64) -> u32 {
        if measured_width <= 0.0 || self.glyph_width <= 0.0 {
            return 1;
        }
        (measured_width / self.glyph_width + 1.0).floor() as u32
    }

    /// Best candidate among the width classes within `tolerance` of the measured one.
    ///
    /// Every canonical name and confusable variant is scored; the strictly highest score
    /// wins, so the earlier candidate keeps a tie. `None` when the classes hold no
    /// candidates or nothing scores above zero.
    pub fn reconcile(
        &self,
        raw_text: &str,
        measured_width: f64,
        vocabulary: &Vocabulary,
        tolerance: u32,
    ) -> Option<Reconciled> {
        let text = normalize(raw_text);
        if text.is_empty() {
            return None;
        }
        let weight = self.weight_class(measured_width);
        let lo = weight.saturating_sub(tolerance);
        let hi = weight.saturating_add(tolerance);

        let mut best: Option<Reconciled> = None;
        let mut seen = false;
        for w in lo..=hi {
            for candidate in vocabulary.class(w) {
                seen = true;
                for form in &candidate.forms {
                    let score = jaro_winkler(&text, form);
                    if score > best.as_ref().map_or(0.0, |b| b.score) {
                        best = Some(Reconciled {
                            name: candidate.canonical.clone(),
                            score,
                        });
                    }
                }
            }
        }
        if !seen {
            debug!("no vocabulary entries for weight class {} ('{}')", weight, text);
        }
        debug!("reconciled '{}' (weight {}) -> {:?}", text, weight, best);
        best
    }

    /// Best match over an unpartitioned list of names (character identity).
    pub fn reconcile_any<'a, I>(&self, raw_text: &str, names: I) -> Option<Reconciled>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.reconcile_with_floor(raw_text, names, 0.0)
    }

    /// Like [`reconcile_any`](Self::reconcile_any) but rejects anything scoring below
    /// `floor`.
    pub fn reconcile_with_floor<'a, I>(
        &self,
        raw_text: &str,
        names: I,
        floor: f64,
    ) -> Option<Reconciled>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let text = normalize(raw_text);
        if text.is_empty() {
            return None;
        }
        let mut best: Option<Reconciled> = None;
        for name in names {
            let score = jaro_winkler(&text, name);
            if score > best.as_ref().map_or(0.0, |b| b.score) {
                best = Some(Reconciled {
                    name: name.to_string(),
                    score,
                });
            }
        }
        best.filter(|b| b.score >= floor)
    }
}
