// src/analysis/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("invalid input signal: {0}")]
    InvalidInput(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("invalid fusion weights: {0}")]
    InvalidWeight(String),
    #[error("EEG score is required for fusion but none was supplied")]
    MissingPrimaryInput,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl ScreeningError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        ScreeningError::InvalidInput(msg.into())
    }

    pub(crate) fn insufficient(msg: impl Into<String>) -> Self {
        ScreeningError::InsufficientData(msg.into())
    }

    pub(crate) fn invalid_weight(msg: impl Into<String>) -> Self {
        ScreeningError::InvalidWeight(msg.into())
    }
}
