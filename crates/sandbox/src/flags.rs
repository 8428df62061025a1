//! Selection of interception families the detector installs.

bitflags::bitflags! {
    /// Intercept flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct InterceptFlags: u32 {
        /// Filter cross-origin messages from the embedded widget.
        const MESSAGES = 1 << 0;
        /// Absorb back navigation.
        const HISTORY = 1 << 1;
        /// Block new browsing contexts.
        const POPUPS = 1 << 2;
        /// Strip `target=_blank` and block cross-origin link activation.
        const LINKS = 1 << 3;
        /// Refuse native fullscreen and force exit if entered.
        const FULLSCREEN = 1 << 4;
        /// Swallow player shortcut keys.
        const KEYS = 1 << 5;
        /// Suppress long-press, double-click, context menu and drag.
        const GESTURES = 1 << 6;
        /// Treat the page becoming hidden during playback as an escape.
        const VISIBILITY = 1 << 7;
        /// Treat window blur during playback as an escape.
        const BLUR = 1 << 8;
    }
}

impl InterceptFlags {
    /// Everything except blur, which fires whenever focus moves into the
    /// embedded frame.
    pub fn recommended() -> Self {
        Self::all() - Self::BLUR
    }

    /// Parse a whitespace or comma separated list such as `"keys history"`.
    pub fn parse_list(list: &str) -> Option<Self> {
        let mut flags = Self::empty();
        for token in list
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            flags |= match token.to_ascii_lowercase().as_str() {
                "messages" => Self::MESSAGES,
                "history" => Self::HISTORY,
                "popups" => Self::POPUPS,
                "links" => Self::LINKS,
                "fullscreen" => Self::FULLSCREEN,
                "keys" => Self::KEYS,
                "gestures" => Self::GESTURES,
                "visibility" => Self::VISIBILITY,
                "blur" => Self::BLUR,
                "all" => Self::all(),
                _ => return None,
            };
        }
        Some(flags)
    }
}

impl Default for InterceptFlags {
    fn default() -> Self {
        Self::recommended()
    }
}
