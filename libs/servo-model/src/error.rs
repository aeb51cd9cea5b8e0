//! Model Layer Error Types

use thiserror::Error;

/// Result type for servo-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model layer errors
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    /// File read/write error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Device address outside the valid unit identifier range
    #[error("Invalid device address: {0} (valid range 1-247)")]
    InvalidAddress(u16),

    /// Parameter key not present in the catalog
    #[error("Parameter not found in catalog: {0}")]
    ParameterNotFound(String),
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
