//! Error types shared by the segmentation crates

use thiserror::Error;

/// Result type alias for segmentation operations
pub type Result<T> = std::result::Result<T, SegError>;

/// Shared error type for configuration and setup failures
#[derive(Error, Debug)]
pub enum SegError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Logging setup error: {0}")]
    Logging(String),
}

impl SegError {
    /// Build a configuration error for an environment variable that failed to parse
    pub fn invalid_env(name: &str, value: &str) -> Self {
        SegError::Config(format!("{name} has an invalid value: {value:?}"))
    }
}
