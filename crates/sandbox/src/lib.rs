//! Escape detection and containment for the embedded player.
//!
//! This crate implements:
//! - Origin allow-listing for the widget's message channel
//! - Tagged parsing and classification of widget messages
//! - Capture-phase interception of history, popups, links, fullscreen, keys and gestures
//! - The containment context that owns every subscription and fans escape attempts out
//!   to registered reactions

pub mod adapter;
pub mod classify;
pub mod containment;
pub mod counter;
mod detector;
pub mod flags;
pub mod keys;
pub mod message;
pub mod origin;
pub mod policy;
pub mod signal;
pub mod subscription;

pub use classify::{Classifier, SignalContext};
pub use containment::{
    Containment, ContainmentSnapshot, ReactionCallback, ReactionHandle, ReactionId,
};
pub use counter::EscapeCounter;
pub use flags::InterceptFlags;
pub use keys::{KeyAction, KeyPolicy, DEFAULT_BLOCKED_KEYS, ESCAPE_KEY};
pub use message::{MessageVocabulary, WidgetMessage, DEFAULT_DENY_PATTERNS, DEFAULT_SAFE_EVENTS};
pub use origin::{AllowedOrigins, Origin, DEFAULT_EMBED_ORIGINS};
pub use policy::{ContainmentPolicy, DEFAULT_LONG_PRESS, SENTINEL_ENTRIES};
pub use signal::{BenignReason, EscapeClassification, EscapeReason, EscapeSignal, GestureKind};
pub use subscription::Subscription;
