//! Host state, timing configuration and progress.

use crate::error::PlayerError;
use std::fmt;
use std::time::Duration;

pub const DESKTOP_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const MOBILE_LOAD_TIMEOUT: Duration = Duration::from_secs(45);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const END_OVERLAY_THRESHOLD: Duration = Duration::from_secs(12);

/// Per-video host state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Initializing,
    Ready,
    Playing,
    Paused,
    Ended,
    Error(PlayerError),
    Retrying,
}

impl PlayerState {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::Initializing => "initializing",
            PlayerState::Ready => "ready",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Ended => "ended",
            PlayerState::Error(_) => "error",
            PlayerState::Retrying => "retrying",
        }
    }

    /// Whether playback commands make sense in this state.
    pub fn accepts_commands(&self) -> bool {
        matches!(
            self,
            PlayerState::Ready | PlayerState::Playing | PlayerState::Paused | PlayerState::Ended
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlayerState::Error(_))
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Error(err) => write!(f, "error ({})", err),
            other => f.write_str(other.name()),
        }
    }
}

/// Timing and behavior knobs for one host.
#[derive(Clone, Debug, PartialEq)]
pub struct HostConfig {
    pub load_timeout: Duration,
    pub poll_interval: Duration,
    pub end_overlay_threshold: Duration,
    pub autoplay: bool,
    /// Try to lock landscape orientation on first play.
    pub lock_orientation: bool,
}

impl HostConfig {
    pub fn desktop() -> Self {
        Self::default()
    }

    pub fn mobile() -> Self {
        Self {
            load_timeout: MOBILE_LOAD_TIMEOUT,
            ..Self::default()
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Clamped to the supported polling range.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        self
    }

    pub fn with_end_overlay_threshold(mut self, threshold: Duration) -> Self {
        self.end_overlay_threshold = threshold;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            load_timeout: DESKTOP_LOAD_TIMEOUT,
            poll_interval: MIN_POLL_INTERVAL,
            end_overlay_threshold: END_OVERLAY_THRESHOLD,
            autoplay: true,
            lock_orientation: true,
        }
    }
}

/// Last observed playback position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub current: Duration,
    pub duration: Option<Duration>,
}

impl Progress {
    pub fn remaining(&self) -> Option<Duration> {
        self.duration.map(|d| d.saturating_sub(self.current))
    }

    /// Position as a fraction of the duration, for the seek bar.
    pub fn fraction(&self) -> f64 {
        match self.duration {
            Some(d) if !d.is_zero() => (self.current.as_secs_f64() / d.as_secs_f64()).min(1.0),
            _ => 0.0,
        }
    }

    /// Within `threshold` of a known, non-zero end.
    pub fn near_end(&self, threshold: Duration) -> bool {
        match (self.duration, self.remaining()) {
            (Some(d), Some(remaining)) if !d.is_zero() => remaining <= threshold,
            _ => false,
        }
    }
}
