//! In-process model of the browser surface the playback core runs against.
//!
//! This crate is the platform adapter boundary: everything the containment
//! layer observes or suppresses (events, history, popups, fullscreen,
//! orientation, timers, anchors) goes through the types here, so the rest of
//! the workspace never touches a real browser API directly.

pub mod attributes;
pub mod document;
pub mod error;
pub mod events;
pub mod mutation;
pub mod window;

pub use attributes::AttributeMap;
pub use document::{Document, Element, NodeId};
pub use error::{DomError, DomResult};
pub use events::{
    Event, EventCallback, EventDetail, EventListenerOptions, EventPhase, EventType, ListenerId,
    ListenerScope, MessageData,
};
pub use mutation::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use window::{
    FullscreenInterceptor, History, Location, OpenDisposition, OpenInterceptor, OpenedWindow,
    OrientationLock, Screen, TimerCallback, TimerId, Window,
};
