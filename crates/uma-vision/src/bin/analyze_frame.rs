//! CLI tool to run one template through the multi-scale matcher and dump what it found.
//! Usage: cargo run -p uma-vision --features cli --bin analyze_frame -- <screenshot> <template> [output_dir]

use anyhow::{Context, Result};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::warn;
use uma_vision::preprocess::{crop_band, resize_to_width, WORKING_WIDTH};
use uma_vision::{crop, MultiScaleMatcher, PreparedTemplate, ScaleRange};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <screenshot> <template> [output_dir]", args[0]);
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let template_path = PathBuf::from(&args[2]);
    let output_dir = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./debug_output"));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    println!("Loading image: {}", input_path.display());
    let img = image::open(&input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?
        .to_rgba8();
    println!("Image size: {}x{}", img.width(), img.height());

    let working = crop_band(
        &resize_to_width(&img, WORKING_WIDTH, FilterType::CatmullRom),
        0.1,
        0.5,
    );
    save(&working, &output_dir.join("working.png"));

    let template = image::open(&template_path)
        .with_context(|| format!("Failed to open {}", template_path.display()))?
        .to_rgba8();
    let template = resize_to_width(&template, WORKING_WIDTH, FilterType::CatmullRom);
    let prepared = PreparedTemplate::new(&image::imageops::grayscale(&template));

    println!("\n=== Anchor Search ===");
    let gray = image::imageops::grayscale(&working);
    let matcher = MultiScaleMatcher::with_min_score(f32::MIN);
    match matcher.locate(&gray, &prepared, ScaleRange::new(1.1, 1.5, 10)) {
        Some(m) => {
            println!(
                "Anchor: ({:.1}, {:.1}) - ({:.1}, {:.1}) score={:.3} ratio={:.3}",
                m.bbox.start_x, m.bbox.start_y, m.bbox.end_x, m.bbox.end_y, m.score, m.scale_ratio
            );
            if let Some(anchor) = crop(&working, &m.bbox) {
                save(&anchor, &output_dir.join("anchor.png"));
            }
        }
        None => println!("Anchor: NOT FOUND"),
    }

    println!("\nDebug images saved to: {}", output_dir.display());
    Ok(())
}

fn save(image: &image::RgbaImage, path: &Path) {
    if let Err(e) = image.save(path) {
        warn!("Failed to save {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_failure_is_reported_not_fatal() {
        let img = image::RgbaImage::new(2, 2);
        save(&img, Path::new("/nonexistent-dir/working.png"));
    }
}
