use crate::region::BoundingBox;
use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// One recognized text line and the box it spans in the OCR'd image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineBox {
    pub content: String,
    pub bbox: BoundingBox,
}

/// Text recognition capability. Implementations never fail loudly: a backend error is
/// reported and yields empty output, the same as an image with no text.
pub trait Ocr: Send + Sync {
    fn recognize_digits(&self, image: &GrayImage) -> String;
    fn recognize_text_single_line(&self, image: &GrayImage, lang: &str) -> String;
    fn recognize_line_boxes(&self, image: &GrayImage, lang: &str) -> Vec<LineBox>;
}

/// OCR through the Tesseract command line tool.
/// Falls back gracefully when Tesseract is not installed.
pub struct TesseractOcr {
    executable: PathBuf,
    available: bool,
}

impl TesseractOcr {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let available = check_tesseract(&executable);
        if available {
            debug!("Tesseract OCR available at {}", executable.display());
        } else {
            warn!(
                "Tesseract not found at {}. OCR disabled, text fields will be empty",
                executable.display()
            );
        }
        Self {
            executable,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn run(&self, image: &GrayImage, args: &[&str]) -> Result<String> {
        let input = NamedTempFile::with_suffix(".png").context("creating OCR temp file")?;
        image
            .save(input.path())
            .with_context(|| format!("writing {}", input.path().display()))?;

        let output = Command::new(&self.executable)
            .arg(input.path())
            .arg("stdout")
            .args(args)
            .output()
            .with_context(|| format!("spawning {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }
        String::from_utf8(output.stdout).context("Tesseract output is not UTF-8")
    }

    fn run_or_empty(&self, image: &GrayImage, args: &[&str]) -> String {
        if !self.available {
            return String::new();
        }
        match self.run(image, args) {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR failed: {:#}", e);
                String::new()
            }
        }
    }
}

impl Ocr for TesseractOcr {
    fn recognize_digits(&self, image: &GrayImage) -> String {
        let text = self.run_or_empty(
            image,
            &["--psm", "7", "-c", "tessedit_char_whitelist=0123456789"],
        );
        let trimmed = text.trim().to_string();
        debug!("OCR digits: '{}'", trimmed);
        trimmed
    }

    fn recognize_text_single_line(&self, image: &GrayImage, lang: &str) -> String {
        let text = self.run_or_empty(image, &["-l", lang, "--psm", "7"]);
        let trimmed = text.trim().to_string();
        debug!("OCR line: '{}'", trimmed);
        trimmed
    }

    fn recognize_line_boxes(&self, image: &GrayImage, lang: &str) -> Vec<LineBox> {
        let tsv = self.run_or_empty(image, &["-l", lang, "--psm", "6", "tsv"]);
        let lines = parse_tsv_lines(&tsv);
        debug!("OCR line boxes: {:?}", lines);
        lines
    }
}

/// Group Tesseract TSV word rows (level 5) into lines.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text
pub fn parse_tsv_lines(tsv: &str) -> Vec<LineBox> {
    let mut lines: BTreeMap<(u32, u32, u32), LineBox> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }
        if fields[0].parse::<u32>().ok() != Some(5) {
            continue;
        }
        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }
        let num = |i: usize| fields[i].trim().parse::<f64>().ok();
        let (Some(left), Some(top), Some(width), Some(height)) = (num(6), num(7), num(8), num(9))
        else {
            continue;
        };
        let key = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        let word = BoundingBox::new(left, top, left + width, top + height);

        lines
            .entry((key(2), key(3), key(4)))
            .and_modify(|line| {
                line.content.push(' ');
                line.content.push_str(text);
                line.bbox = BoundingBox::new(
                    line.bbox.start_x.min(word.start_x),
                    line.bbox.start_y.min(word.start_y),
                    line.bbox.end_x.max(word.end_x),
                    line.bbox.end_y.max(word.end_y),
                );
            })
            .or_insert_with(|| LineBox {
                content: text.to_string(),
                bbox: word,
            });
    }

    lines.into_values().collect()
}

/// Keep ASCII digits only.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Check if Tesseract is installed and accessible
fn check_tesseract(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t400\t60\t-1\t
4\t1\t1\t1\t1\t0\t10\t5\t200\t22\t-1\t
5\t1\t1\t1\t1\t1\t10\t5\t80\t20\t91.2\tコーナー
5\t1\t1\t1\t1\t2\t95\t6\t115\t21\t88.0\t回復◯
5\t1\t1\t1\t2\t1\t12\t40\t60\t18\t75.5\tLv
5\t1\t1\t1\t2\t2\t80\t40\t10\t18\t-1\t \n";

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let lines = parse_tsv_lines(TSV);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "コーナー 回復◯");
        assert_eq!(lines[0].bbox, BoundingBox::new(10.0, 5.0, 210.0, 27.0));
        assert_eq!(lines[1].content, "Lv");
    }

    #[test]
    fn test_parse_tsv_empty() {
        assert!(parse_tsv_lines("").is_empty());
        assert!(parse_tsv_lines("level\tpage_num\n").is_empty());
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only(" 1,2O3 4\n"), "1234");
        assert_eq!(digits_only("abc"), "");
    }

    #[test]
    fn test_missing_tesseract_degrades_to_empty() {
        let ocr = TesseractOcr::new("/nonexistent/tesseract-binary");
        assert!(!ocr.is_available());
        let img = GrayImage::new(10, 10);
        assert_eq!(ocr.recognize_digits(&img), "");
        assert!(ocr.recognize_line_boxes(&img, "jpn").is_empty());
    }
}
