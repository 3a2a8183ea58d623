use thiserror::Error;

/// Request-level failures. Anchors that are not found and text that does not reconcile
/// are not errors; they surface as empty fields in the records.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A template or master-data document could not be loaded. Indicates a deployment
    /// problem rather than anything about the uploaded image.
    #[error("failed to load resource {path}")]
    ResourceLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The upload is not an image we accept.
    #[error("{0}")]
    InputFormat(String),

    /// A field-group worker panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),

    #[error("extraction timed out")]
    Timeout,
}

impl ExtractError {
    pub fn resource(path: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ExtractError::resource("templates/skill_tab.png", io);
        assert_eq!(err.to_string(), "failed to load resource templates/skill_tab.png");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no such file"));
    }
}
