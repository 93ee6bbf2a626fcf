use thiserror::Error;

/// Failures loading configuration or content tables. Simulation itself
/// never fails; it clamps and reports through messages.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid content: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
