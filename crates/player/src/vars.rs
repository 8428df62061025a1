//! Initialization parameters for the embedded widget.

use crate::error::{PlayerError, PlayerResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Embed host used when building frame URLs.
pub const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed/";

/// Parameters passed to the widget at load time.
///
/// The defaults strip every piece of chrome the widget would otherwise draw:
/// native controls, keyboard shortcuts, related videos, the fullscreen
/// button and annotations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerVars {
    pub autoplay: bool,
    pub controls: bool,
    pub disablekb: bool,
    pub rel: bool,
    pub fs: bool,
    pub iv_load_policy: u8,
    pub modestbranding: bool,
    pub playsinline: bool,
    pub enablejsapi: bool,
    /// Origin of the embedding page, required for the message channel.
    pub origin: Option<String>,
}

impl PlayerVars {
    pub fn minimal_chrome(origin: &str) -> Self {
        Self {
            origin: Some(origin.to_string()),
            ..Self::default()
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Query pairs in the order the widget documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();
        let mut pairs = vec![
            ("autoplay", flag(self.autoplay)),
            ("controls", flag(self.controls)),
            ("disablekb", flag(self.disablekb)),
            ("rel", flag(self.rel)),
            ("fs", flag(self.fs)),
            ("iv_load_policy", self.iv_load_policy.to_string()),
            ("modestbranding", flag(self.modestbranding)),
            ("playsinline", flag(self.playsinline)),
            ("enablejsapi", flag(self.enablejsapi)),
        ];
        if let Some(origin) = &self.origin {
            pairs.push(("origin", origin.clone()));
        }
        pairs
    }

    /// Frame URL for a video.
    pub fn embed_url(&self, video_id: &str) -> PlayerResult<Url> {
        validate_video_id(video_id)?;
        let mut url = Url::parse(EMBED_BASE)
            .and_then(|base| base.join(video_id))
            .map_err(|e| PlayerError::InvalidVideoId(format!("{}: {}", video_id, e)))?;
        url.query_pairs_mut()
            .extend_pairs(self.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }
}

impl Default for PlayerVars {
    fn default() -> Self {
        Self {
            autoplay: false,
            controls: false,
            disablekb: true,
            rel: false,
            fs: false,
            iv_load_policy: 3,
            modestbranding: true,
            playsinline: true,
            enablejsapi: true,
            origin: None,
        }
    }
}

/// Video ids are eleven characters of `[A-Za-z0-9_-]`.
pub fn validate_video_id(video_id: &str) -> PlayerResult<()> {
    let valid = video_id.len() == 11
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PlayerError::InvalidVideoId(video_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vars_hide_chrome() {
        let vars = PlayerVars::default();
        let pairs = vars.query_pairs();
        for (key, expected) in [
            ("controls", "0"),
            ("disablekb", "1"),
            ("rel", "0"),
            ("fs", "0"),
            ("iv_load_policy", "3"),
            ("playsinline", "1"),
        ] {
            let value = pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
            assert_eq!(value, Some(expected), "{key}");
        }
    }

    #[test]
    fn test_embed_url() {
        let vars = PlayerVars::minimal_chrome("https://app.example").with_autoplay(true);
        let url = vars.embed_url("abc12345678").unwrap();
        assert_eq!(url.host_str(), Some("www.youtube-nocookie.com"));
        assert_eq!(url.path(), "/embed/abc12345678");
        assert!(url.query().unwrap().contains("autoplay=1"));
        assert!(url.query().unwrap().contains("origin=https%3A%2F%2Fapp.example"));
    }

    #[test]
    fn test_video_id_validation() {
        assert!(validate_video_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_video_id("a-b_c123456").is_ok());
        assert!(validate_video_id("short").is_err());
        assert!(validate_video_id("../../etc/x").is_err());
    }
}
