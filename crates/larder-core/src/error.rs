use thiserror::Error;

/// Top-level error type for Larder.
#[derive(Error, Debug)]
pub enum LarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LarderError>;
