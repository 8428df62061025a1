//! DOM Events implementation.

use crate::document::NodeId;
use derive_more::Display;
use indexmap::IndexMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Event type enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    // Pointer and gesture events
    Click,
    DblClick,
    ContextMenu,
    TouchStart,
    TouchEnd,
    DragStart,

    // Keyboard events
    KeyDown,
    KeyUp,

    // Focus events
    Focus,
    Blur,
    VisibilityChange,

    // Window events
    Message,
    PopState,
    FullscreenChange,

    // Other
    Custom(String),
}

impl EventType {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "click" => EventType::Click,
            "dblclick" => EventType::DblClick,
            "contextmenu" => EventType::ContextMenu,
            "touchstart" => EventType::TouchStart,
            "touchend" => EventType::TouchEnd,
            "dragstart" => EventType::DragStart,
            "keydown" => EventType::KeyDown,
            "keyup" => EventType::KeyUp,
            "focus" => EventType::Focus,
            "blur" => EventType::Blur,
            "visibilitychange" => EventType::VisibilityChange,
            "message" => EventType::Message,
            "popstate" => EventType::PopState,
            "fullscreenchange" | "webkitfullscreenchange" => EventType::FullscreenChange,
            other => EventType::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::Click => "click",
            EventType::DblClick => "dblclick",
            EventType::ContextMenu => "contextmenu",
            EventType::TouchStart => "touchstart",
            EventType::TouchEnd => "touchend",
            EventType::DragStart => "dragstart",
            EventType::KeyDown => "keydown",
            EventType::KeyUp => "keyup",
            EventType::Focus => "focus",
            EventType::Blur => "blur",
            EventType::VisibilityChange => "visibilitychange",
            EventType::Message => "message",
            EventType::PopState => "popstate",
            EventType::FullscreenChange => "fullscreenchange",
            EventType::Custom(s) => s,
        }
    }

    /// Check if event bubbles by default.
    pub fn bubbles(&self) -> bool {
        !matches!(
            self,
            EventType::Focus
                | EventType::Blur
                | EventType::Message
                | EventType::PopState
                | EventType::VisibilityChange
        )
    }

    /// Check if event is cancelable by default.
    ///
    /// `popstate` is cancelable here: the surface applies the route change
    /// as its default action so a listener can keep the current view.
    pub fn cancelable(&self) -> bool {
        !matches!(
            self,
            EventType::Focus
                | EventType::Blur
                | EventType::Message
                | EventType::VisibilityChange
                | EventType::FullscreenChange
        )
    }
}

/// Event phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPhase {
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// Payload carried by a cross-document message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageData {
    /// String payload, usually JSON-encoded by the sender.
    Text(String),
    /// Structured-clone payload.
    Json(serde_json::Value),
}

/// Type-specific event data.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventDetail {
    #[default]
    None,
    Key {
        key: String,
        code: String,
    },
    Message {
        origin: String,
        data: MessageData,
    },
    PopState {
        state: Option<serde_json::Value>,
    },
    Visibility {
        hidden: bool,
    },
    Fullscreen {
        element: Option<NodeId>,
    },
}

/// DOM Event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Event type.
    pub event_type: EventType,
    /// Target element, `None` when the window itself is the target.
    pub target: Option<NodeId>,
    /// Event phase.
    pub phase: EventPhase,
    /// Whether event bubbles.
    pub bubbles: bool,
    /// Whether event is cancelable.
    pub cancelable: bool,
    /// Whether default was prevented.
    pub default_prevented: bool,
    /// Whether propagation was stopped.
    pub propagation_stopped: bool,
    /// Whether immediate propagation was stopped.
    pub immediate_propagation_stopped: bool,
    /// Whether event is trusted (browser-generated).
    pub is_trusted: bool,
    /// Timestamp in milliseconds on the window clock, stamped at dispatch.
    pub timestamp: f64,
    /// Type-specific data.
    pub detail: EventDetail,
}

impl Event {
    pub fn new(event_type: EventType) -> Self {
        let bubbles = event_type.bubbles();
        let cancelable = event_type.cancelable();

        Self {
            event_type,
            target: None,
            phase: EventPhase::None,
            bubbles,
            cancelable,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            is_trusted: false,
            timestamp: 0.0,
            detail: EventDetail::None,
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Keyboard event for `key`.
    pub fn key_down(key: &str) -> Self {
        Self::new(EventType::KeyDown).with_detail(EventDetail::Key {
            key: key.to_string(),
            code: key_code_for(key),
        })
    }

    /// Incoming cross-document message.
    pub fn message(origin: &str, data: MessageData) -> Self {
        Self::new(EventType::Message).with_detail(EventDetail::Message {
            origin: origin.to_string(),
            data,
        })
    }

    pub fn pop_state(state: Option<serde_json::Value>) -> Self {
        Self::new(EventType::PopState).with_detail(EventDetail::PopState { state })
    }

    /// The pressed key, if this is a keyboard event.
    pub fn key(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Key { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Prevent default action.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop immediate propagation.
    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(EventType::Custom(String::new()))
    }
}

fn key_code_for(key: &str) -> String {
    match key {
        " " => "Space".to_string(),
        k if k.len() == 1 && k.chars().all(|c| c.is_ascii_alphabetic()) => {
            format!("Key{}", k.to_ascii_uppercase())
        }
        k if k.len() == 1 && k.chars().all(|c| c.is_ascii_digit()) => format!("Digit{}", k),
        k => k.to_string(),
    }
}

/// Event listener callback type.
pub type EventCallback = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Event listener options.
#[derive(Clone, Debug, Default)]
pub struct EventListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl EventListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }
}

/// Where a listener is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerScope {
    Window,
    Node(NodeId),
}

/// Handle for removing a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("listener#{_0}")]
pub struct ListenerId(u64);

/// Event listener.
#[derive(Clone)]
pub struct EventListener {
    pub scope: ListenerScope,
    pub event_type: EventType,
    pub callback: EventCallback,
    pub options: EventListenerOptions,
}

/// Listener registry with registration-ordered dispatch.
pub struct EventManager {
    listeners: IndexMap<ListenerId, EventListener>,
    next_id: u64,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            listeners: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Add a listener and return its id.
    pub fn add_listener(
        &mut self,
        scope: ListenerScope,
        event_type: EventType,
        callback: EventCallback,
        options: EventListenerOptions,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(
            id,
            EventListener {
                scope,
                event_type,
                callback,
                options,
            },
        );
        id
    }

    /// Remove a listener by id. Returns false if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.shift_remove(&id).is_some()
    }

    /// Snapshot of the listeners matching a scope, type and phase.
    pub fn snapshot(
        &self,
        scope: ListenerScope,
        event_type: &EventType,
        capture: Option<bool>,
    ) -> Vec<(ListenerId, EventListener)> {
        self.listeners
            .iter()
            .filter(|(_, l)| l.scope == scope && &l.event_type == event_type)
            .filter(|(_, l)| capture.map_or(true, |c| l.options.capture == c))
            .map(|(id, l)| (*id, l.clone()))
            .collect()
    }

    /// Number of listeners registered for an event type, all scopes.
    pub fn count(&self, event_type: &EventType) -> usize {
        self.listeners
            .values()
            .filter(|l| &l.event_type == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Remove all listeners attached to a node.
    pub fn remove_all(&mut self, node: NodeId) {
        self.listeners
            .retain(|_, l| l.scope != ListenerScope::Node(node));
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke one listener. A panicking listener is logged and never aborts dispatch.
pub(crate) fn invoke_isolated(id: ListenerId, listener: &EventListener, event: &mut Event) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.callback)(event)));
    if outcome.is_err() {
        tracing::error!(
            "{} for '{}' panicked; continuing dispatch",
            id,
            event.event_type.as_str()
        );
    }
}
