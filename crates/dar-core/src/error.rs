use thiserror::Error;

#[derive(Debug, Error)]
pub enum DarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DarError {
    /// Short error code string used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DarError::Config(_) => "CONFIG_ERROR",
            DarError::InvalidTime(_) => "CONFIG_ERROR",
            DarError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DarError>;
