pub mod extract;

use crate::config::{Command, Config};
use crate::pipeline::Pipeline;
use extract::{error_envelope, ok_envelope, read_upload};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uma_extract::ExtractError;

/// Run one subcommand and return the JSON envelope to print.
pub async fn execute(config: &Config) -> Result<Value, ExtractError> {
    let (image_path, support) = match &config.command {
        Command::Status { image } => (image, false),
        Command::Support { image } => (image, true),
    };
    let image = Arc::new(read_upload(image_path, config.max_content_length)?);
    info!(
        "{} {}x{}",
        image_path.display(),
        image.width(),
        image.height()
    );
    let pipeline = Pipeline::load(config)?;
    if support {
        Ok(ok_envelope(&pipeline.extract_support(image).await?))
    } else {
        Ok(ok_envelope(&pipeline.extract_full(image).await?))
    }
}

/// Report a failure the way a successful run reports its data.
pub fn failure(err: &ExtractError) -> Value {
    match err {
        ExtractError::ResourceLoad { path, source } => {
            error!("resource {} failed to load: {:#}", path, source);
        }
        other => error!("{}", other),
    }
    error_envelope(&err.to_string())
}
