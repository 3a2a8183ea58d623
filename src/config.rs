use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 5 * 1024 * 1024;

/// Uma Musume screenshot reader.
#[derive(Debug, Clone, Parser)]
#[command(name = "uma-ocr", version, about)]
pub struct Config {
    /// Resource root holding `templates/` and `master_data/`
    #[arg(long, env = "UMA_OCR_ROOT", default_value = "resources")]
    pub root: PathBuf,

    /// Write intermediate crops under this directory
    #[arg(long, env = "UMA_OCR_DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Layout override, as a path inside the resource root
    #[arg(long, env = "UMA_OCR_LAYOUT")]
    pub layout: Option<String>,

    /// Tesseract executable
    #[arg(long, env = "UMA_OCR_TESSERACT", default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "UMA_OCR_MAX_CONTENT_LENGTH", default_value_t = DEFAULT_MAX_CONTENT_LENGTH)]
    pub max_content_length: u64,

    /// Deadline for one whole extraction
    #[arg(long, env = "UMA_OCR_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Read a character detail screenshot
    Status { image: PathBuf },
    /// Read a support-character screenshot
    Support { image: PathBuf },
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Default `EnvFilter` directives when `RUST_LOG` is unset.
    pub fn log_directives(&self) -> &'static str {
        if self.verbose {
            "uma_ocr=debug,uma_ocr_lib=debug,uma_extract=debug,uma_vision=debug,uma_data=debug"
        } else {
            "uma_ocr=info,uma_ocr_lib=info,uma_extract=info,uma_vision=info,uma_data=info"
        }
    }
}
