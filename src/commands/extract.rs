use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;
use uma_extract::ExtractError;

pub const UNSUPPORTED_FORMAT: &str = "support extension jpg, jpeg or png";

/// Validate and decode an upload. Anything rejected here never reaches the extractors.
pub fn decode_upload(bytes: &[u8], max_content_length: u64) -> Result<RgbaImage, ExtractError> {
    if bytes.len() as u64 > max_content_length {
        return Err(ExtractError::InputFormat(format!(
            "file too large: {} bytes exceeds {}",
            bytes.len(),
            max_content_length
        )));
    }
    let format = match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        _ => return Err(ExtractError::InputFormat(UNSUPPORTED_FORMAT.to_string())),
    };
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ExtractError::InputFormat(format!("cannot decode image: {}", e)))?;
    debug!(
        "decoded {:?} upload {}x{}",
        format,
        image.width(),
        image.height()
    );
    Ok(image.to_rgba8())
}

pub fn read_upload(path: &Path, max_content_length: u64) -> Result<RgbaImage, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ExtractError::InputFormat(format!("cannot read {}: {}", path.display(), e))
    })?;
    decode_upload(&bytes, max_content_length)
}

/// `{"result": "OK", "data": ...}`
pub fn ok_envelope<T: Serialize>(data: &T) -> Value {
    match serde_json::to_value(data) {
        Ok(data) => json!({ "result": "OK", "data": data }),
        Err(e) => error_envelope(&format!("cannot serialize result: {}", e)),
    }
}

/// `{"result": "<message>"}`
pub fn error_envelope(message: &str) -> Value {
    json!({ "result": message })
}
