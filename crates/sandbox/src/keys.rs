//! Player shortcut keys swallowed while locked.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const ESCAPE_KEY: &str = "Escape";

/// Keys the embedded player binds: fullscreen, seek, volume, mute,
/// captions, number-row seek-to-percent, and escape.
pub static DEFAULT_BLOCKED_KEYS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut keys = vec![
        "f", "j", "l", "m", "c", "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown", "Home",
        "End", ESCAPE_KEY,
    ];
    keys.extend(["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    keys
});

/// What to do with a key press while locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Let it through.
    Pass,
    /// Suppress default and stop propagation.
    Swallow,
    /// Swallow and report an escape attempt.
    SwallowAndEscape,
}

/// Blocked key set.
#[derive(Clone, Debug)]
pub struct KeyPolicy {
    blocked: HashSet<String>,
}

impl KeyPolicy {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            blocked: keys.into_iter().map(normalize).collect(),
        }
    }

    pub fn is_blocked(&self, key: &str) -> bool {
        self.blocked.contains(&normalize(key))
    }

    pub fn action(&self, key: &str) -> KeyAction {
        if !self.is_blocked(key) {
            KeyAction::Pass
        } else if key == ESCAPE_KEY || key == "Esc" {
            KeyAction::SwallowAndEscape
        } else {
            KeyAction::Swallow
        }
    }
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_KEYS.iter().copied())
    }
}

/// Single characters compare case-insensitively (`F` with shift held is still fullscreen).
fn normalize(key: &str) -> String {
    if key == "Esc" {
        return ESCAPE_KEY.to_string();
    }
    if key.chars().count() == 1 {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_blocked_keys() {
        let policy = KeyPolicy::default();
        for key in ["f", "F", "m", "c", "ArrowLeft", "ArrowUp", "5", "0"] {
            assert_eq!(policy.action(key), KeyAction::Swallow, "{key}");
        }
        assert_eq!(policy.action("Escape"), KeyAction::SwallowAndEscape);
        assert_eq!(policy.action("Esc"), KeyAction::SwallowAndEscape);
    }

    #[test]
    fn test_unlisted_keys_pass() {
        let policy = KeyPolicy::default();
        assert_eq!(policy.action(" "), KeyAction::Pass);
        assert_eq!(policy.action("a"), KeyAction::Pass);
        assert_eq!(policy.action("Tab"), KeyAction::Pass);
        // Named keys are case-sensitive.
        assert_eq!(policy.action("arrowleft"), KeyAction::Pass);
    }
}
