//! Error types for etlflow

use thiserror::Error;

/// Result type alias for etlflow operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Main error type for etlflow
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode object key '{key}': {reason}")]
    KeyDecode { key: String, reason: String },
}
