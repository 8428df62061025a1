//! Common error types.

use thiserror::Error;

/// Top-level error type for the playback subsystem.
#[derive(Error, Debug)]
pub enum SafeViewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Containment error: {0}")]
    Containment(String),

    #[error("Player error: {0}")]
    Player(String),

    #[error("Parent gate error: {0}")]
    Gate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Screen time: {0}")]
    ScreenTime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type SafeViewResult<T> = Result<T, SafeViewError>;

impl SafeViewError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn containment(msg: impl Into<String>) -> Self {
        Self::Containment(msg.into())
    }

    pub fn player(msg: impl Into<String>) -> Self {
        Self::Player(msg.into())
    }

    pub fn gate(msg: impl Into<String>) -> Self {
        Self::Gate(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn screen_time(msg: impl Into<String>) -> Self {
        Self::ScreenTime(msg.into())
    }

    /// Whether the view layer should offer a retry for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Player(_) | Self::Metadata(_) | Self::Storage(_))
    }
}
