//! DOM Window object implementation.

use crate::document::{Document, NodeId};
use crate::error::{DomError, DomResult};
use crate::events::{
    invoke_isolated, Event, EventCallback, EventDetail, EventListener, EventListenerOptions,
    EventManager, EventPhase, EventType, ListenerId, ListenerScope, MessageData,
};
use derive_more::Display;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Decision returned by an open interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenDisposition {
    Allow,
    Block,
}

/// Hook consulted before `window.open` creates a browsing context.
pub type OpenInterceptor = Arc<dyn Fn(&str, &str) -> OpenDisposition + Send + Sync>;

/// Hook consulted before an element enters fullscreen through the standard request path.
pub type FullscreenInterceptor = Arc<dyn Fn(NodeId) -> DomResult<()> + Send + Sync>;

/// Timer callback type.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Timer handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("timer#{_0}")]
pub struct TimerId(u64);

/// A browsing context created through `open`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedWindow {
    pub url: String,
    pub target: String,
}

/// Browser window object.
///
/// State lives behind per-field locks so listeners and timer callbacks can
/// call back into the window while an event is being dispatched.
pub struct Window {
    document: Arc<Document>,
    location: RwLock<Location>,
    history: RwLock<History>,
    events: RwLock<EventManager>,
    timers: RwLock<Timers>,
    screen: RwLock<Screen>,
    fullscreen_element: RwLock<Option<NodeId>>,
    hidden: RwLock<bool>,
    user_activation: RwLock<bool>,
    opened: RwLock<Vec<OpenedWindow>>,
    open_interceptor: RwLock<Option<OpenInterceptor>>,
    fullscreen_interceptor: RwLock<Option<FullscreenInterceptor>>,
}

impl Window {
    pub fn new(url: Url) -> Self {
        Self {
            document: Arc::new(Document::new(url.clone())),
            location: RwLock::new(Location::from_url(&url)),
            history: RwLock::new(History::new(url.as_str())),
            events: RwLock::new(EventManager::new()),
            timers: RwLock::new(Timers::default()),
            screen: RwLock::new(Screen::default()),
            fullscreen_element: RwLock::new(None),
            hidden: RwLock::new(false),
            user_activation: RwLock::new(false),
            opened: RwLock::new(Vec::new()),
            open_interceptor: RwLock::new(None),
            fullscreen_interceptor: RwLock::new(None),
        }
    }

    /// Parse `url` and create a window for it.
    pub fn open_at(url: &str) -> DomResult<Self> {
        let parsed = Url::parse(url).map_err(|e| DomError::InvalidUrl(e.to_string()))?;
        Ok(Self::new(parsed))
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Serialized origin of the app document.
    pub fn origin(&self) -> String {
        self.location.read().origin.clone()
    }

    pub fn location(&self) -> Location {
        self.location.read().clone()
    }

    // Event listeners

    pub fn add_event_listener(
        &self,
        scope: ListenerScope,
        event_type: EventType,
        callback: EventCallback,
        options: EventListenerOptions,
    ) -> ListenerId {
        self.events
            .write()
            .add_listener(scope, event_type, callback, options)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.events.write().remove_listener(id)
    }

    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.events.read().count(event_type)
    }

    pub fn total_listeners(&self) -> usize {
        self.events.read().len()
    }

    /// Dispatch an event. Returns false if the default action was prevented.
    ///
    /// Path is window (capture) -> target node -> window (bubble). For events
    /// targeted at the window itself, capture listeners run before the others.
    pub fn dispatch_event(&self, event: &mut Event) -> bool {
        event.is_trusted = true;
        event.timestamp = self.now().as_secs_f64() * 1000.0;

        match event.target {
            Some(node) => {
                event.phase = EventPhase::Capturing;
                self.run_listeners(ListenerScope::Window, Some(true), event);

                if !event.propagation_stopped {
                    event.phase = EventPhase::AtTarget;
                    self.run_listeners(ListenerScope::Node(node), None, event);
                }

                if !event.propagation_stopped && event.bubbles {
                    event.phase = EventPhase::Bubbling;
                    self.run_listeners(ListenerScope::Window, Some(false), event);
                }
            }
            None => {
                event.phase = EventPhase::AtTarget;
                self.run_listeners(ListenerScope::Window, Some(true), event);
                if !event.immediate_propagation_stopped {
                    self.run_listeners(ListenerScope::Window, Some(false), event);
                }
            }
        }

        event.phase = EventPhase::None;
        !event.default_prevented
    }

    fn run_listeners(&self, scope: ListenerScope, capture: Option<bool>, event: &mut Event) {
        let listeners: Vec<(ListenerId, EventListener)> =
            self.events.read().snapshot(scope, &event.event_type, capture);

        for (id, listener) in listeners {
            invoke_isolated(id, &listener, event);
            if listener.options.once {
                self.events.write().remove_listener(id);
            }
            if event.immediate_propagation_stopped {
                break;
            }
        }
    }

    /// Build, dispatch and return an event of the given type.
    pub fn fire(&self, event_type: EventType, target: Option<NodeId>) -> Event {
        let mut event = Event::new(event_type);
        event.target = target;
        self.dispatch_event(&mut event);
        event
    }

    /// Key press on the focused element.
    pub fn key_down(&self, key: &str, target: Option<NodeId>) -> Event {
        let mut event = Event::key_down(key);
        event.target = target;
        self.dispatch_event(&mut event);
        event
    }

    /// Deliver a message posted to this window by another document.
    pub fn receive_message(&self, origin: &str, data: MessageData) -> Event {
        let mut event = Event::message(origin, data);
        self.dispatch_event(&mut event);
        event
    }

    // Navigation

    /// Activate an element; anchors navigate unless the click is prevented.
    pub fn click(&self, node: NodeId) -> Event {
        let mut event = Event::new(EventType::Click).with_target(node);
        *self.user_activation.write() = true;
        if self.dispatch_event(&mut event) {
            self.follow_link(node);
        }
        event
    }

    fn follow_link(&self, node: NodeId) {
        let Some(element) = self.document.element(node) else {
            return;
        };
        if !element.is_anchor() {
            return;
        }
        let Some(href) = element.attributes.get("href") else {
            return;
        };
        let url = match self.document.resolve_url(href) {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!("ignoring link activation: {}", err);
                return;
            }
        };

        match element.attributes.get("target") {
            Some(target) if target.eq_ignore_ascii_case("_blank") => {
                self.open(url.as_str(), "_blank");
            }
            _ => self.navigate(&url),
        }
    }

    /// Same-tab navigation: push a history entry and move the location.
    pub fn navigate(&self, url: &Url) {
        self.history.write().push_state(None, url.as_str());
        *self.location.write() = Location::from_url(url);
    }

    /// Simulate the browser back button.
    ///
    /// Returns true if the route actually changed.
    pub fn navigate_back(&self) -> bool {
        let entry = match self.history.write().back() {
            Some(entry) => entry.clone(),
            None => return false,
        };

        let mut event = Event::pop_state(entry.state.clone());
        if !self.dispatch_event(&mut event) {
            return false;
        }

        match Url::parse(&entry.url) {
            Ok(url) => {
                *self.location.write() = Location::from_url(&url);
                true
            }
            Err(err) => {
                tracing::debug!("history entry has unparsable url: {}", err);
                false
            }
        }
    }

    /// `history.pushState` keeping the current URL.
    pub fn push_state(&self, state: Option<serde_json::Value>) {
        let href = self.location.read().href.clone();
        self.history.write().push_state(state, &href);
    }

    pub fn history_length(&self) -> usize {
        self.history.read().length()
    }

    pub fn history_index(&self) -> usize {
        self.history.read().index()
    }

    // Popups

    /// `window.open`. Returns `None` when blocked.
    pub fn open(&self, url: &str, target: &str) -> Option<OpenedWindow> {
        let interceptor = self.open_interceptor.read().clone();
        if let Some(interceptor) = interceptor {
            if interceptor(url, target) == OpenDisposition::Block {
                tracing::debug!("window.open({}) blocked", url);
                return None;
            }
        }

        let opened = OpenedWindow {
            url: url.to_string(),
            target: target.to_string(),
        };
        self.opened.write().push(opened.clone());
        Some(opened)
    }

    /// Install or clear the open hook, returning the previous one.
    pub fn set_open_interceptor(
        &self,
        interceptor: Option<OpenInterceptor>,
    ) -> Option<OpenInterceptor> {
        std::mem::replace(&mut *self.open_interceptor.write(), interceptor)
    }

    pub fn has_open_interceptor(&self) -> bool {
        self.open_interceptor.read().is_some()
    }

    pub fn opened_windows(&self) -> Vec<OpenedWindow> {
        self.opened.read().clone()
    }

    // Fullscreen

    /// `Element.requestFullscreen`.
    pub fn request_fullscreen(&self, node: NodeId) -> DomResult<()> {
        if !self.screen.read().fullscreen_supported {
            return Err(DomError::FullscreenUnsupported);
        }
        let interceptor = self.fullscreen_interceptor.read().clone();
        if let Some(interceptor) = interceptor {
            interceptor(node)?;
        }
        self.enter_fullscreen(node);
        Ok(())
    }

    /// Vendor fullscreen path that does not go through the standard request hook.
    pub fn enter_fullscreen(&self, node: NodeId) {
        *self.fullscreen_element.write() = Some(node);
        let mut event = Event::new(EventType::FullscreenChange).with_detail(
            EventDetail::Fullscreen {
                element: Some(node),
            },
        );
        self.dispatch_event(&mut event);
    }

    /// `document.exitFullscreen`.
    pub fn exit_fullscreen(&self) -> bool {
        let previous = self.fullscreen_element.write().take();
        if previous.is_none() {
            return false;
        }
        let mut event = Event::new(EventType::FullscreenChange)
            .with_detail(EventDetail::Fullscreen { element: None });
        self.dispatch_event(&mut event);
        true
    }

    pub fn fullscreen_element(&self) -> Option<NodeId> {
        *self.fullscreen_element.read()
    }

    pub fn set_fullscreen_interceptor(
        &self,
        interceptor: Option<FullscreenInterceptor>,
    ) -> Option<FullscreenInterceptor> {
        std::mem::replace(&mut *self.fullscreen_interceptor.write(), interceptor)
    }

    pub fn has_fullscreen_interceptor(&self) -> bool {
        self.fullscreen_interceptor.read().is_some()
    }

    // Focus and visibility

    pub fn set_hidden(&self, hidden: bool) -> Event {
        *self.hidden.write() = hidden;
        let mut event = Event::new(EventType::VisibilityChange)
            .with_detail(EventDetail::Visibility { hidden });
        self.dispatch_event(&mut event);
        event
    }

    pub fn is_hidden(&self) -> bool {
        *self.hidden.read()
    }

    pub fn blur(&self) -> Event {
        self.fire(EventType::Blur, None)
    }

    // Screen

    pub fn screen(&self) -> Screen {
        self.screen.read().clone()
    }

    pub fn set_screen(&self, screen: Screen) {
        *self.screen.write() = screen;
    }

    pub fn set_user_activation(&self, active: bool) {
        *self.user_activation.write() = active;
    }

    /// `screen.orientation.lock`.
    pub fn lock_orientation(&self, lock: OrientationLock) -> DomResult<()> {
        if !self.screen.read().orientation_lock_supported {
            return Err(DomError::OrientationUnsupported);
        }
        if !*self.user_activation.read() {
            return Err(DomError::OrientationRequiresGesture);
        }
        self.screen.write().locked_orientation = Some(lock);
        Ok(())
    }

    pub fn unlock_orientation(&self) {
        self.screen.write().locked_orientation = None;
    }

    // Timers

    /// Current time on the window clock.
    pub fn now(&self) -> Duration {
        self.timers.read().now
    }

    pub fn set_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerId {
        self.timers.write().schedule(callback, delay, false)
    }

    pub fn set_interval(&self, callback: TimerCallback, delay: Duration) -> TimerId {
        self.timers.write().schedule(callback, delay, true)
    }

    /// Clear a timeout or interval. Returns false if it was not active.
    pub fn clear_timer(&self, id: TimerId) -> bool {
        self.timers.write().entries.shift_remove(&id).is_some()
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.read().entries.contains_key(&id)
    }

    pub fn timer_delay(&self, id: TimerId) -> Option<Duration> {
        self.timers.read().entries.get(&id).map(|t| t.delay)
    }

    pub fn active_timers(&self) -> usize {
        self.timers.read().entries.len()
    }

    /// Advance the clock, running every timer that comes due. Returns the
    /// number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        let mut fired = 0;

        loop {
            let callback = {
                let mut timers = self.timers.write();
                match timers.pop_due(deadline) {
                    Some(callback) => callback,
                    None => break,
                }
            };
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                tracing::error!("timer callback panicked");
            }
            fired += 1;
        }

        self.timers.write().now = deadline;
        fired
    }
}

struct Timer {
    callback: TimerCallback,
    delay: Duration,
    repeat: bool,
    due: Duration,
}

#[derive(Default)]
struct Timers {
    now: Duration,
    entries: IndexMap<TimerId, Timer>,
    next_id: u64,
}

impl Timers {
    fn schedule(&mut self, callback: TimerCallback, delay: Duration, repeat: bool) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        // A zero-period interval would never let the clock move.
        let delay = if repeat {
            delay.max(Duration::from_millis(1))
        } else {
            delay
        };
        self.entries.insert(
            id,
            Timer {
                callback,
                delay,
                repeat,
                due: self.now + delay,
            },
        );
        id
    }

    fn pop_due(&mut self, deadline: Duration) -> Option<TimerCallback> {
        let id = self
            .entries
            .iter()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(id, t)| (t.due, id.0))
            .map(|(id, _)| *id)?;

        let timer = self.entries.get_mut(&id)?;
        self.now = self.now.max(timer.due);
        let callback = timer.callback.clone();
        if timer.repeat {
            timer.due += timer.delay;
        } else {
            self.entries.shift_remove(&id);
        }
        Some(callback)
    }
}

/// Window location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub href: String,
    pub host: String,
    pub pathname: String,
    pub origin: String,
}

impl Location {
    pub fn from_url(url: &Url) -> Self {
        Self {
            href: url.to_string(),
            host: url.host_str().unwrap_or("").to_string()
                + url.port().map(|p| format!(":{}", p)).as_deref().unwrap_or(""),
            pathname: url.path().to_string(),
            origin: url.origin().ascii_serialization(),
        }
    }
}

/// Session history.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<HistoryEntry>,
    current: usize,
}

/// A single history entry.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub url: String,
    pub state: Option<serde_json::Value>,
}

impl History {
    pub fn new(initial_url: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                url: initial_url.to_string(),
                state: None,
            }],
            current: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current)
    }

    pub fn back(&mut self) -> Option<&HistoryEntry> {
        if self.current > 0 {
            self.current -= 1;
            self.entries.get(self.current)
        } else {
            None
        }
    }

    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
            self.entries.get(self.current)
        } else {
            None
        }
    }

    pub fn push_state(&mut self, state: Option<serde_json::Value>, url: &str) {
        // Drop forward entries.
        self.entries.truncate(self.current + 1);
        self.entries.push(HistoryEntry {
            url: url.to_string(),
            state,
        });
        self.current = self.entries.len() - 1;
    }
}

/// Requested orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationLock {
    Landscape,
    Portrait,
}

/// Screen capabilities and state.
#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
    pub fullscreen_supported: bool,
    pub orientation_lock_supported: bool,
    pub locked_orientation: Option<OrientationLock>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen_supported: true,
            orientation_lock_supported: false,
            locked_orientation: None,
        }
    }
}

impl Screen {
    pub fn mobile() -> Self {
        Self {
            width: 390,
            height: 844,
            fullscreen_supported: false,
            orientation_lock_supported: true,
            locked_orientation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeMap;
    use parking_lot::Mutex;

    fn window() -> Window {
        Window::open_at("https://app.example/").unwrap()
    }

    #[test]
    fn test_location() {
        let loc = Location::from_url(&Url::parse("https://example.com:8080/path?q#h").unwrap());
        assert_eq!(loc.host, "example.com:8080");
        assert_eq!(loc.pathname, "/path");
        assert_eq!(loc.origin, "https://example.com:8080");
    }

    #[test]
    fn test_history_truncation() {
        let mut history = History::new("/1");
        history.push_state(None, "/2");
        history.push_state(None, "/3");
        history.back();
        history.back();
        history.push_state(None, "/new");
        assert_eq!(history.length(), 2);
        assert_eq!(history.current().unwrap().url, "/new");
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_capture_runs_before_target() {
        let window = window();
        let frame = window.document().create_element("iframe", AttributeMap::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        window.add_event_listener(
            ListenerScope::Node(frame),
            EventType::KeyDown,
            Arc::new(move |_| o.lock().push("frame")),
            EventListenerOptions::default(),
        );
        let o = order.clone();
        window.add_event_listener(
            ListenerScope::Window,
            EventType::KeyDown,
            Arc::new(move |_| o.lock().push("capture")),
            EventListenerOptions::capture(),
        );

        window.key_down("k", Some(frame));
        assert_eq!(*order.lock(), vec!["capture", "frame"]);
    }

    #[test]
    fn test_stop_propagation_hides_event_from_target() {
        let window = window();
        let frame = window.document().create_element("iframe", AttributeMap::new());
        let reached = Arc::new(Mutex::new(false));

        let r = reached.clone();
        window.add_event_listener(
            ListenerScope::Node(frame),
            EventType::KeyDown,
            Arc::new(move |_| *r.lock() = true),
            EventListenerOptions::default(),
        );
        window.add_event_listener(
            ListenerScope::Window,
            EventType::KeyDown,
            Arc::new(|e| {
                e.prevent_default();
                e.stop_propagation();
            }),
            EventListenerOptions::capture(),
        );

        let event = window.key_down("f", Some(frame));
        assert!(event.default_prevented);
        assert!(!*reached.lock());
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let window = window();
        let calls = Arc::new(Mutex::new(0));
        window.add_event_listener(
            ListenerScope::Window,
            EventType::Blur,
            Arc::new(|_| panic!("listener failure")),
            EventListenerOptions::default(),
        );
        let c = calls.clone();
        window.add_event_listener(
            ListenerScope::Window,
            EventType::Blur,
            Arc::new(move |_| *c.lock() += 1),
            EventListenerOptions::default(),
        );

        window.blur();
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_back_changes_route_by_default() {
        let window = window();
        window.navigate(&Url::parse("https://app.example/watch/abc").unwrap());
        assert!(window.navigate_back());
        assert_eq!(window.location().pathname, "/");
    }

    #[test]
    fn test_prevented_back_keeps_route() {
        let window = window();
        window.navigate(&Url::parse("https://app.example/watch/abc").unwrap());
        window.add_event_listener(
            ListenerScope::Window,
            EventType::PopState,
            Arc::new(|e| e.prevent_default()),
            EventListenerOptions::capture(),
        );
        assert!(!window.navigate_back());
        assert_eq!(window.location().pathname, "/watch/abc");
    }

    #[test]
    fn test_target_blank_link_opens_window() {
        let window = window();
        let link = window.document().create_element(
            "a",
            AttributeMap::from_pairs([("href", "https://video.example/x"), ("target", "_blank")]),
        );
        window.click(link);
        assert_eq!(window.opened_windows().len(), 1);
        assert_eq!(window.location().pathname, "/");
    }

    #[test]
    fn test_open_interceptor() {
        let window = window();
        let previous = window.set_open_interceptor(Some(Arc::new(|_, _| OpenDisposition::Block)));
        assert!(previous.is_none());
        assert!(window.open("https://elsewhere.example", "_blank").is_none());

        window.set_open_interceptor(None);
        assert!(window.open("https://elsewhere.example", "_blank").is_some());
    }

    #[test]
    fn test_fullscreen_interceptor_rejects() {
        let window = window();
        let frame = window.document().create_element("iframe", AttributeMap::new());
        window.set_fullscreen_interceptor(Some(Arc::new(|_| {
            Err(DomError::FullscreenDenied("locked".to_string()))
        })));
        assert!(window.request_fullscreen(frame).is_err());
        assert!(window.fullscreen_element().is_none());

        window.enter_fullscreen(frame);
        assert_eq!(window.fullscreen_element(), Some(frame));
        assert!(window.exit_fullscreen());
    }

    #[test]
    fn test_orientation_lock_requires_gesture() {
        let window = window();
        assert_eq!(
            window.lock_orientation(OrientationLock::Landscape),
            Err(DomError::OrientationUnsupported)
        );
        window.set_screen(Screen::mobile());
        assert_eq!(
            window.lock_orientation(OrientationLock::Landscape),
            Err(DomError::OrientationRequiresGesture)
        );
        window.set_user_activation(true);
        assert!(window.lock_orientation(OrientationLock::Landscape).is_ok());
        assert_eq!(
            window.screen().locked_orientation,
            Some(OrientationLock::Landscape)
        );
    }

    #[test]
    fn test_timers() {
        let window = window();
        let ticks = Arc::new(Mutex::new(0));
        let t = ticks.clone();
        let interval = window.set_interval(Arc::new(move || *t.lock() += 1), Duration::from_millis(500));
        let fired = Arc::new(Mutex::new(false));
        let f = fired.clone();
        window.set_timeout(Arc::new(move || *f.lock() = true), Duration::from_secs(2));

        assert_eq!(window.advance(Duration::from_millis(1600)), 3);
        assert_eq!(*ticks.lock(), 3);
        assert!(!*fired.lock());

        window.advance(Duration::from_millis(400));
        assert!(*fired.lock());
        assert_eq!(*ticks.lock(), 4);

        assert!(window.clear_timer(interval));
        window.advance(Duration::from_secs(5));
        assert_eq!(*ticks.lock(), 4);
        assert_eq!(window.now(), Duration::from_secs(7));
    }
}
