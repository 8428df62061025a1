//! Errors raised by the browser surface model.

use thiserror::Error;

/// Refusals and failures from browser APIs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Fullscreen request denied: {0}")]
    FullscreenDenied(String),

    #[error("Fullscreen API not supported")]
    FullscreenUnsupported,

    #[error("Screen orientation lock not supported")]
    OrientationUnsupported,

    #[error("Screen orientation lock requires a user gesture")]
    OrientationRequiresGesture,

    #[error("Unknown node")]
    UnknownNode,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid observer options: {0}")]
    InvalidObserverOptions(&'static str),
}

pub type DomResult<T> = Result<T, DomError>;
