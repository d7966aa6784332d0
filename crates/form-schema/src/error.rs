use thiserror::Error;

/// Failures of the local key-value slot. The store logs and swallows them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored value has an unexpected shape: {0}")]
    Shape(&'static str),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
