//! Containment policy: allow-lists, blocked keys and enabled intercepts.

use crate::flags::InterceptFlags;
use crate::keys::KeyPolicy;
use crate::message::MessageVocabulary;
use crate::origin::{AllowedOrigins, DEFAULT_EMBED_ORIGINS};
use common::{SafeViewError, SafeViewResult};
use std::time::Duration;

/// Hold time after which a touch counts as a long-press.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(500);

/// History entries pushed on lock to absorb rapid double-back.
pub const SENTINEL_ENTRIES: usize = 2;

/// Everything the detector needs to classify signals.
#[derive(Clone, Debug)]
pub struct ContainmentPolicy {
    pub origins: AllowedOrigins,
    pub vocabulary: MessageVocabulary,
    pub keys: KeyPolicy,
    pub flags: InterceptFlags,
    pub long_press: Duration,
}

impl ContainmentPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origins(mut self, origins: AllowedOrigins) -> Self {
        self.origins = origins;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: MessageVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn with_keys(mut self, keys: KeyPolicy) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_flags(mut self, flags: InterceptFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_long_press(mut self, long_press: Duration) -> Self {
        self.long_press = long_press;
        self
    }

    pub fn intercepts(&self, flag: InterceptFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn validate(&self) -> SafeViewResult<()> {
        if self.flags.is_empty() {
            return Err(SafeViewError::config("at least one intercept family must be enabled"));
        }
        if self.intercepts(InterceptFlags::MESSAGES) && self.origins.is_empty() {
            return Err(SafeViewError::config("message filtering needs at least one embed origin"));
        }
        if self.long_press.is_zero() {
            return Err(SafeViewError::config("long-press threshold must be positive"));
        }
        Ok(())
    }
}

impl Default for ContainmentPolicy {
    fn default() -> Self {
        Self {
            origins: AllowedOrigins::from_strs(DEFAULT_EMBED_ORIGINS.iter().copied()),
            vocabulary: MessageVocabulary::default(),
            keys: KeyPolicy::default(),
            flags: InterceptFlags::default(),
            long_press: DEFAULT_LONG_PRESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(ContainmentPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let empty = ContainmentPolicy::new().with_flags(InterceptFlags::empty());
        assert!(empty.validate().is_err());

        let no_origins = ContainmentPolicy::new().with_origins(AllowedOrigins::new());
        assert!(no_origins.validate().is_err());

        let keys_only = ContainmentPolicy::new()
            .with_origins(AllowedOrigins::new())
            .with_flags(InterceptFlags::KEYS);
        assert!(keys_only.validate().is_ok());
    }
}
