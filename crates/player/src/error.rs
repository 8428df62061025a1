//! Player host errors.

use common::SafeViewError;
use std::time::Duration;

/// Player error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("Invalid video id: {0}")]
    InvalidVideoId(String),

    #[error("Widget did not become ready within {0:?}")]
    LoadTimeout(Duration),

    #[error("Widget error {code}: {message}")]
    Widget { code: i64, message: String },

    #[error("Widget command failed: {0}")]
    Command(String),

    #[error("Player not ready")]
    NotReady,

    #[error("Cannot {action} while {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("Player already unmounted")]
    Unmounted,
}

impl PlayerError {
    /// Error codes the widget reports through `onError`.
    pub fn from_widget_code(code: i64) -> Self {
        let message = match code {
            2 => "invalid parameter",
            5 => "html5 player error",
            100 => "video not found",
            101 | 150 => "embedding not allowed",
            _ => "unknown error",
        };
        PlayerError::Widget {
            code,
            message: message.to_string(),
        }
    }

    /// Whether the retry screen should be offered.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlayerError::LoadTimeout(_) | PlayerError::Command(_) => true,
            PlayerError::Widget { code, .. } => matches!(code, 5),
            _ => false,
        }
    }
}

impl From<PlayerError> for SafeViewError {
    fn from(err: PlayerError) -> Self {
        SafeViewError::player(err.to_string())
    }
}

pub type PlayerResult<T> = Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_codes() {
        let err = PlayerError::from_widget_code(150);
        assert_eq!(err.to_string(), "Widget error 150: embedding not allowed");
        assert!(!err.is_retryable());
        assert!(PlayerError::LoadTimeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn test_into_top_level_error() {
        let err: SafeViewError = PlayerError::NotReady.into();
        assert!(err.is_retryable());
    }
}
