//! VoxPrep Error Types
//!
//! Centralized error handling for the interview assistant.

use thiserror::Error;

/// Central error type for VoxPrep
#[derive(Error, Debug)]
pub enum VoxError {
    #[error("Speech capability unavailable: {0}")]
    Capability(String),

    #[error("Device permission denied: {0}")]
    Permission(String),

    #[error("ASR engine error: {0}")]
    Asr(String),

    #[error("TTS engine error: {0}")]
    Tts(String),

    #[error("Audio capture error: {0}")]
    Audio(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for VoxPrep operations
pub type VoxResult<T> = Result<T, VoxError>;

impl VoxError {
    /// Build a MalformedResponse keeping the raw model output for debugging
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        VoxError::MalformedResponse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

impl From<reqwest::Error> for VoxError {
    fn from(err: reqwest::Error) -> Self {
        VoxError::Api(err.to_string())
    }
}

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for VoxError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        VoxError::Lock(err.to_string())
    }
}
