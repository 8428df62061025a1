//! The third-party widget seam.
//!
//! The host drives the widget through `EmbeddedWidget` and hears back from
//! it over the window's message channel, the same way the real frame talks
//! to its embedder.

use crate::error::PlayerResult;
use crate::vars::PlayerVars;
use dom::MessageData;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Commands the host can send to the widget.
pub trait EmbeddedWidget: Send + Sync {
    fn load(&self, video_id: &str, vars: &PlayerVars) -> PlayerResult<()>;
    fn play(&self) -> PlayerResult<()>;
    fn pause(&self) -> PlayerResult<()>;
    fn seek_to(&self, position: Duration) -> PlayerResult<()>;
    fn set_muted(&self, muted: bool) -> PlayerResult<()>;
    fn current_time(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    /// Tear down the frame. Must tolerate being called twice.
    fn destroy(&self);
}

/// Playback states as the widget numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidgetPlayback {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl WidgetPlayback {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }
}

/// A widget notification the host acts on.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetEvent {
    Ready,
    StateChange(WidgetPlayback),
    Error(i64),
    Progress {
        current: Duration,
        duration: Option<Duration>,
    },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    info: Value,
}

impl WidgetEvent {
    /// Parse a message payload. Anything the host does not act on is `None`.
    pub fn parse(data: &MessageData) -> Option<Self> {
        let envelope: Envelope = match data {
            MessageData::Text(text) => serde_json::from_str(text).ok()?,
            MessageData::Json(value) => Envelope::deserialize(value).ok()?,
        };

        match envelope.event.as_str() {
            "onReady" => Some(Self::Ready),
            "onStateChange" => envelope
                .info
                .as_i64()
                .and_then(WidgetPlayback::from_code)
                .map(Self::StateChange),
            "onError" => envelope.info.as_i64().map(Self::Error),
            "infoDelivery" => {
                let current = envelope.info.get("currentTime")?.as_f64()?;
                let duration = envelope
                    .info
                    .get("duration")
                    .and_then(Value::as_f64)
                    .filter(|d| *d > 0.0)
                    .map(Duration::from_secs_f64);
                Some(Self::Progress {
                    current: Duration::from_secs_f64(current.max(0.0)),
                    duration,
                })
            }
            _ => None,
        }
    }

    /// The wire form, as the widget would post it.
    pub fn to_message(&self) -> MessageData {
        let value = match self {
            Self::Ready => json!({ "event": "onReady" }),
            Self::StateChange(state) => json!({ "event": "onStateChange", "info": state.code() }),
            Self::Error(code) => json!({ "event": "onError", "info": code }),
            Self::Progress { current, duration } => json!({
                "event": "infoDelivery",
                "info": {
                    "currentTime": current.as_secs_f64(),
                    "duration": duration.map(|d| d.as_secs_f64()).unwrap_or(0.0),
                },
            }),
        };
        MessageData::Text(value.to_string())
    }
}
