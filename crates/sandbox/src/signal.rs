//! Escape signals and their classification.

use derive_more::Display;
use dom::MessageData;
use url::Url;

/// Nuisance gestures suppressed while locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum GestureKind {
    #[display("long-press")]
    LongPress,
    #[display("double-click")]
    DoubleClick,
    #[display("context-menu")]
    ContextMenu,
    #[display("drag-start")]
    DragStart,
}

/// One raw browser observation, converted for the classifier.
#[derive(Clone, Debug, PartialEq)]
pub enum EscapeSignal {
    /// The window lost focus.
    Blur,
    /// The page was hidden (tab switch, app backgrounded).
    VisibilityHidden,
    /// An element inside the app lost focus to something outside it.
    FocusLoss,
    CrossOriginMessage { origin: String, payload: MessageData },
    PopState,
    /// Fullscreen state changed; `entered` is true when an element is now fullscreen.
    FullscreenChange { entered: bool },
    /// A standard fullscreen request.
    FullscreenRequest,
    /// A key from the blocked set.
    BlockedKey(String),
    PopupRequest { url: String },
    LinkActivation { url: Url },
    Gesture(GestureKind),
}

/// Why a signal counts as an escape attempt.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum EscapeReason {
    #[display("message from untrusted origin {origin}")]
    UntrustedOrigin { origin: String },
    #[display("navigation-like widget event '{event}'")]
    NavigationMessage { event: String },
    #[display("back navigation")]
    HistoryPop,
    #[display("popup to {url}")]
    PopupBlocked { url: String },
    #[display("external link to {url}")]
    ExternalLink { url: String },
    #[display("native fullscreen request")]
    FullscreenRequest,
    #[display("escape key")]
    EscapeKey,
    #[display("page hidden during playback")]
    VisibilityHidden,
    #[display("focus left the player")]
    FocusLoss,
    /// Raised by app code rather than the detector.
    #[display("{_0}")]
    Manual(String),
}

/// Why a signal was let through.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum BenignReason {
    #[display("containment not locked")]
    Unlocked,
    #[display("not playing")]
    NotPlaying,
    #[display("known widget event '{_0}'")]
    SafeWidgetEvent(String),
    #[display("unrecognized widget event '{_0}'")]
    UnrecognizedEvent(String),
    #[display("unstructured payload")]
    Unstructured,
    #[display("same-origin link")]
    SameOriginLink,
    #[display("nuisance key '{_0}'")]
    NuisanceKey(String),
    #[display("nuisance gesture {_0}")]
    NuisanceGesture(GestureKind),
    #[display("fullscreen contained")]
    FullscreenContained,
    #[display("interception disabled")]
    Disabled,
}

/// Classifier outcome. Only `EscapeAttempt` may trigger containment actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscapeClassification {
    Benign(BenignReason),
    EscapeAttempt(EscapeReason),
}

impl EscapeClassification {
    pub fn is_escape(&self) -> bool {
        matches!(self, Self::EscapeAttempt(_))
    }

    pub fn escape_reason(&self) -> Option<&EscapeReason> {
        match self {
            Self::EscapeAttempt(reason) => Some(reason),
            Self::Benign(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_display() {
        let reason = EscapeReason::UntrustedOrigin {
            origin: "https://evil.example".to_string(),
        };
        assert_eq!(reason.to_string(), "message from untrusted origin https://evil.example");
        assert_eq!(
            BenignReason::NuisanceGesture(GestureKind::LongPress).to_string(),
            "nuisance gesture long-press"
        );
    }

    #[test]
    fn test_classification_accessors() {
        let escape = EscapeClassification::EscapeAttempt(EscapeReason::HistoryPop);
        assert!(escape.is_escape());
        assert_eq!(escape.escape_reason(), Some(&EscapeReason::HistoryPop));

        let benign = EscapeClassification::Benign(BenignReason::Unlocked);
        assert!(!benign.is_escape());
        assert!(benign.escape_reason().is_none());
    }
}
