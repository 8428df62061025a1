//! Application configuration.

use crate::screen_time::ScreenTimePolicy;
use common::{SafeViewError, SafeViewResult};
use gate::{Difficulty, WrongAnswerPolicy};
use player::state::{MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use player::HostConfig;
use sandbox::{
    AllowedOrigins, ContainmentPolicy, InterceptFlags, KeyPolicy, MessageVocabulary,
    DEFAULT_BLOCKED_KEYS, DEFAULT_DENY_PATTERNS, DEFAULT_EMBED_ORIGINS, DEFAULT_SAFE_EVENTS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Configuration for the playback view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Origin the app itself is served from.
    pub app_origin: String,
    /// Origins the embedded widget may post from.
    pub embed_origins: Vec<String>,
    /// Widget event names treated as routine status.
    pub safe_events: Vec<String>,
    /// Substrings that mark an unknown widget event as navigation.
    pub deny_patterns: Vec<String>,
    /// Keys swallowed while locked.
    pub blocked_keys: Vec<String>,
    pub intercept: InterceptFlags,
    pub load_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub end_overlay_threshold_secs: u64,
    pub long_press_ms: u64,
    pub autoplay: bool,
    pub gate_difficulty: Difficulty,
    pub wrong_answer_policy: WrongAnswerPolicy,
    pub screen_time: Option<ScreenTimePolicy>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desktop() -> Self {
        Self::default()
    }

    pub fn mobile() -> Self {
        Self {
            load_timeout_ms: 45_000,
            ..Self::default()
        }
    }

    /// Read and validate a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> SafeViewResult<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&data)?;
        tracing::debug!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json(data: &str) -> SafeViewResult<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_intercept(mut self, intercept: InterceptFlags) -> Self {
        self.intercept = intercept;
        self
    }

    /// Clamped to 500..=1000 ms.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval
            .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
            .as_millis() as u64;
        self
    }

    pub fn with_gate(mut self, difficulty: Difficulty, policy: WrongAnswerPolicy) -> Self {
        self.gate_difficulty = difficulty;
        self.wrong_answer_policy = policy;
        self
    }

    pub fn with_screen_time(mut self, policy: ScreenTimePolicy) -> Self {
        self.screen_time = Some(policy);
        self
    }

    pub fn validate(&self) -> SafeViewResult<()> {
        let app = Url::parse(&self.app_origin)?;
        if app.cannot_be_a_base() || app.host_str().is_none() {
            return Err(SafeViewError::config(format!(
                "app origin '{}' has no host",
                self.app_origin
            )));
        }
        let poll = Duration::from_millis(self.poll_interval_ms);
        if poll < MIN_POLL_INTERVAL || poll > MAX_POLL_INTERVAL {
            return Err(SafeViewError::config(format!(
                "poll interval {}ms is outside 500..=1000ms",
                self.poll_interval_ms
            )));
        }
        if self.load_timeout_ms == 0 {
            return Err(SafeViewError::config("load timeout must be positive"));
        }
        if self.end_overlay_threshold_secs == 0 {
            return Err(SafeViewError::config("end overlay threshold must be positive"));
        }
        if let Some(screen_time) = &self.screen_time {
            screen_time.validate()?;
        }
        self.containment_policy().validate()
    }

    pub fn containment_policy(&self) -> ContainmentPolicy {
        ContainmentPolicy::new()
            .with_origins(AllowedOrigins::from_strs(
                self.embed_origins.iter().map(String::as_str),
            ))
            .with_vocabulary(MessageVocabulary::new(
                self.safe_events.iter().map(String::as_str),
                self.deny_patterns.iter().map(String::as_str),
            ))
            .with_keys(KeyPolicy::new(self.blocked_keys.iter().map(String::as_str)))
            .with_flags(self.intercept)
            .with_long_press(Duration::from_millis(self.long_press_ms))
    }

    pub fn host_config(&self) -> HostConfig {
        HostConfig::default()
            .with_load_timeout(Duration::from_millis(self.load_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_end_overlay_threshold(Duration::from_secs(self.end_overlay_threshold_secs))
            .with_autoplay(self.autoplay)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_origin: "https://safeview.app".to_string(),
            embed_origins: owned(DEFAULT_EMBED_ORIGINS.iter().copied()),
            safe_events: owned(DEFAULT_SAFE_EVENTS.iter().copied()),
            deny_patterns: owned(DEFAULT_DENY_PATTERNS.iter().copied()),
            blocked_keys: owned(DEFAULT_BLOCKED_KEYS.iter().copied()),
            intercept: InterceptFlags::default(),
            load_timeout_ms: 30_000,
            poll_interval_ms: 500,
            end_overlay_threshold_secs: 12,
            long_press_ms: 500,
            autoplay: true,
            gate_difficulty: Difficulty::Standard,
            wrong_answer_policy: WrongAnswerPolicy::Regenerate,
            screen_time: None,
        }
    }
}

fn owned<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items.map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        assert_eq!(AppConfig::desktop().host_config().load_timeout, Duration::from_secs(30));
        assert_eq!(AppConfig::mobile().host_config().load_timeout, Duration::from_secs(45));
        assert!(AppConfig::mobile().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AppConfig::from_json(
            r#"{ "loadTimeoutMs": 20000, "gateDifficulty": "elevated", "wrongAnswerPolicy": "keep" }"#,
        )
        .unwrap();
        assert_eq!(config.load_timeout_ms, 20_000);
        assert_eq!(config.gate_difficulty, Difficulty::Elevated);
        assert_eq!(config.wrong_answer_policy, WrongAnswerPolicy::Keep);
        assert_eq!(config.poll_interval_ms, 500);
        assert!(!config.intercept.contains(InterceptFlags::BLUR));
    }

    #[test]
    fn test_rejects_out_of_range_poll() {
        let err = AppConfig::from_json(r#"{ "pollIntervalMs": 100 }"#).unwrap_err();
        assert!(matches!(err, SafeViewError::Config(_)));
    }

    #[test]
    fn test_builder_clamps_poll() {
        let config = AppConfig::default().with_poll_interval(Duration::from_secs(3));
        assert_eq!(config.poll_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_intercepts_and_origins() {
        let none = AppConfig::default().with_intercept(InterceptFlags::empty());
        assert!(none.validate().is_err());

        let no_origins = AppConfig {
            embed_origins: vec![],
            ..AppConfig::default()
        };
        assert!(no_origins.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_app_origin() {
        let config = AppConfig {
            app_origin: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(SafeViewError::UrlParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("safeview-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "autoplay": false, "longPressMs": 700 }"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!config.autoplay);
        assert_eq!(config.containment_policy().long_press, Duration::from_millis(700));

        assert!(matches!(
            AppConfig::load(path.with_extension("missing")),
            Err(SafeViewError::Io(_))
        ));
    }

    #[test]
    fn test_containment_policy_carries_lists() {
        let policy = AppConfig::default().containment_policy();
        assert!(policy.origins.allows("https://www.youtube-nocookie.com"));
        assert!(policy.vocabulary.is_safe("onStateChange"));
        assert!(policy.keys.is_blocked("f"));
    }
}
