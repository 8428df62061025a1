//! Parsing of messages posted by the embedded widget.
//!
//! Payloads are reduced to a closed set of shapes before any policy is
//! applied, so the allow-list check is a plain match.

use dom::MessageData;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;

/// Status events the widget's own API emits during normal playback.
pub static DEFAULT_SAFE_EVENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "onReady",
        "onStateChange",
        "onPlaybackQualityChange",
        "onPlaybackRateChange",
        "onError",
        "onApiChange",
        "onVideoProgress",
        "onAutoplayBlocked",
        "infoDelivery",
        "initialDelivery",
        "apiInfoDelivery",
        "listening",
    ]
});

/// Substrings marking an unknown event as navigation-like.
pub static DEFAULT_DENY_PATTERNS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["navigate", "redirect", "click"]);

/// Shape of a widget message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetMessage {
    /// Structured, with an event name on the safe list.
    Known(String),
    /// Structured, with an event name not on the safe list.
    UnknownStructured(String),
    /// Not JSON, or JSON without a string `event` field.
    Unstructured,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
}

/// Safe event names plus deny patterns.
#[derive(Clone, Debug)]
pub struct MessageVocabulary {
    safe_events: HashSet<String>,
    deny_patterns: Vec<String>,
}

impl MessageVocabulary {
    pub fn new<'a>(
        safe_events: impl IntoIterator<Item = &'a str>,
        deny_patterns: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            safe_events: safe_events.into_iter().map(str::to_string).collect(),
            deny_patterns: deny_patterns
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_safe(&self, event: &str) -> bool {
        self.safe_events.contains(event)
    }

    /// Case-insensitive substring match against the deny patterns.
    pub fn is_navigation_like(&self, event: &str) -> bool {
        let lowered = event.to_ascii_lowercase();
        self.deny_patterns.iter().any(|p| lowered.contains(p.as_str()))
    }

    /// Reduce a payload to its shape.
    pub fn parse(&self, data: &MessageData) -> WidgetMessage {
        let envelope = match data {
            MessageData::Text(text) => serde_json::from_str::<Envelope>(text).ok(),
            MessageData::Json(value) => Envelope::deserialize(value).ok(),
        };

        match envelope {
            Some(Envelope { event }) if self.is_safe(&event) => WidgetMessage::Known(event),
            Some(Envelope { event }) => WidgetMessage::UnknownStructured(event),
            None => WidgetMessage::Unstructured,
        }
    }
}

impl Default for MessageVocabulary {
    fn default() -> Self {
        Self::new(
            DEFAULT_SAFE_EVENTS.iter().copied(),
            DEFAULT_DENY_PATTERNS.iter().copied(),
        )
    }
}
