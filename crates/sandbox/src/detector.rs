//! Escape signal detector.
//!
//! Installs capture-phase listeners (and the two window hooks) for each
//! enabled intercept family. Every handler holds only a weak reference to
//! the containment, so a dropped containment turns handlers into no-ops.

use crate::adapter;
use crate::containment::Containment;
use crate::flags::InterceptFlags;
use crate::keys::KeyAction;
use crate::policy::ContainmentPolicy;
use crate::signal::{EscapeSignal, GestureKind};
use crate::subscription::Subscription;
use common::{SafeViewError, SafeViewResult};
use dom::{
    Document, DomError, Event, EventDetail, EventListenerOptions, EventType, ListenerScope,
    MutationObserverInit, MutationRecord, NodeId, OpenDisposition, Window,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Handler = fn(&Containment, &mut Event);

pub(crate) fn install(
    window: &Arc<Window>,
    containment: Weak<Containment>,
    policy: &ContainmentPolicy,
) -> SafeViewResult<Vec<Subscription>> {
    let mut subs = Vec::new();

    if policy.intercepts(InterceptFlags::MESSAGES) {
        subs.push(listen(window, &containment, EventType::Message, "messages", on_message));
    }
    if policy.intercepts(InterceptFlags::HISTORY) {
        subs.push(listen(window, &containment, EventType::PopState, "history", on_pop_state));
    }
    if policy.intercepts(InterceptFlags::POPUPS) {
        subs.push(guard_popups(window, &containment));
    }
    if policy.intercepts(InterceptFlags::LINKS) {
        subs.push(watch_blank_targets(window)?);
        subs.push(listen(window, &containment, EventType::Click, "links", on_click));
    }
    if policy.intercepts(InterceptFlags::FULLSCREEN) {
        subs.push(guard_fullscreen(window, &containment));
        subs.push(listen(
            window,
            &containment,
            EventType::FullscreenChange,
            "fullscreen-change",
            on_fullscreen_change,
        ));
    }
    if policy.intercepts(InterceptFlags::KEYS) {
        subs.push(listen(window, &containment, EventType::KeyDown, "keys", on_key_down));
    }
    if policy.intercepts(InterceptFlags::GESTURES) {
        subs.push(listen(window, &containment, EventType::ContextMenu, "context-menu", on_gesture));
        subs.push(listen(window, &containment, EventType::DblClick, "double-click", on_gesture));
        subs.push(listen(window, &containment, EventType::DragStart, "drag-start", on_gesture));
        subs.extend(watch_long_press(window, &containment));
    }
    if policy.intercepts(InterceptFlags::VISIBILITY) {
        subs.push(listen(
            window,
            &containment,
            EventType::VisibilityChange,
            "visibility",
            on_visibility,
        ));
    }
    if policy.intercepts(InterceptFlags::BLUR) {
        subs.push(listen(window, &containment, EventType::Blur, "blur", on_blur));
    }

    Ok(subs)
}

fn listen(
    window: &Arc<Window>,
    containment: &Weak<Containment>,
    event_type: EventType,
    label: &'static str,
    handler: Handler,
) -> Subscription {
    let containment = containment.clone();
    let id = window.add_event_listener(
        ListenerScope::Window,
        event_type,
        Arc::new(move |event: &mut Event| {
            if let Some(containment) = containment.upgrade() {
                handler(&containment, event);
            }
        }),
        EventListenerOptions::capture(),
    );
    Subscription::listener(window, id, label)
}

// Messages

fn on_message(containment: &Containment, event: &mut Event) {
    let EventDetail::Message { origin, data } = &event.detail else {
        return;
    };
    let signal = EscapeSignal::CrossOriginMessage {
        origin: origin.clone(),
        payload: data.clone(),
    };
    if containment.handle_signal(signal).is_escape() {
        event.stop_immediate_propagation();
    }
}

// History

fn on_pop_state(containment: &Containment, event: &mut Event) {
    if !containment.is_locked() {
        return;
    }
    event.prevent_default();
    event.stop_immediate_propagation();
    containment.push_sentinel();
    containment.handle_signal(EscapeSignal::PopState);
}

// Popups

fn guard_popups(window: &Arc<Window>, containment: &Weak<Containment>) -> Subscription {
    let containment = containment.clone();
    adapter::guard_open(
        window,
        Arc::new(move |url: &str, _target: &str| {
            let Some(containment) = containment.upgrade() else {
                return OpenDisposition::Allow;
            };
            let signal = EscapeSignal::PopupRequest {
                url: url.to_string(),
            };
            if containment.handle_signal(signal).is_escape() {
                OpenDisposition::Block
            } else {
                OpenDisposition::Allow
            }
        }),
    )
}

// Links

fn watch_blank_targets(window: &Arc<Window>) -> SafeViewResult<Subscription> {
    let document = window.document();
    for anchor in document.anchors() {
        strip_blank_target(document, anchor);
    }

    let weak: Weak<Document> = Arc::downgrade(document);
    let options = MutationObserverInit::new()
        .child_list()
        .subtree()
        .attribute_filter(vec!["target".to_string()]);
    let id = document
        .observe(
            options,
            Arc::new(move |records: &[MutationRecord]| {
                let Some(document) = weak.upgrade() else {
                    return;
                };
                for record in records {
                    strip_blank_target(&document, record.target);
                    for added in &record.added_nodes {
                        strip_blank_target(&document, *added);
                    }
                }
            }),
        )
        .map_err(|e| SafeViewError::containment(format!("link observer: {}", e)))?;

    Ok(Subscription::observer(document, id, "link-targets"))
}

fn strip_blank_target(document: &Document, node: NodeId) {
    let Some(element) = document.element(node) else {
        return;
    };
    if !element.is_anchor() {
        return;
    }
    let blank = element
        .attributes
        .get("target")
        .map_or(false, |t| t.eq_ignore_ascii_case("_blank"));
    if blank {
        tracing::debug!("stripping target=_blank from anchor");
        if let Err(err) = document.remove_attribute(node, "target") {
            tracing::debug!("could not strip link target: {}", err);
        }
    }
}

fn on_click(containment: &Containment, event: &mut Event) {
    if !containment.is_locked() {
        return;
    }
    let Some(node) = event.target else {
        return;
    };
    let document = containment.window().document();
    let Some(element) = document.element(node) else {
        return;
    };
    if !element.is_anchor() {
        return;
    }
    let Some(href) = element.attributes.get("href") else {
        return;
    };
    let url = match document.resolve_url(href) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!("unresolvable link: {}", err);
            return;
        }
    };

    if containment
        .handle_signal(EscapeSignal::LinkActivation { url })
        .is_escape()
    {
        event.prevent_default();
        event.stop_propagation();
    }
}

// Fullscreen

fn guard_fullscreen(window: &Arc<Window>, containment: &Weak<Containment>) -> Subscription {
    let containment = containment.clone();
    adapter::guard_fullscreen(
        window,
        Arc::new(move |_node: NodeId| {
            let Some(containment) = containment.upgrade() else {
                return Ok(());
            };
            if containment
                .handle_signal(EscapeSignal::FullscreenRequest)
                .is_escape()
            {
                Err(DomError::FullscreenDenied("playback is contained".to_string()))
            } else {
                Ok(())
            }
        }),
    )
}

fn on_fullscreen_change(containment: &Containment, event: &mut Event) {
    let entered = matches!(
        event.detail,
        EventDetail::Fullscreen {
            element: Some(_)
        }
    );
    if !entered || !containment.is_locked() {
        return;
    }
    containment.handle_signal(EscapeSignal::FullscreenChange { entered });
    tracing::debug!("fullscreen entered while locked; forcing exit");
    containment.window().exit_fullscreen();
}

// Keys

fn on_key_down(containment: &Containment, event: &mut Event) {
    if !containment.is_locked() {
        return;
    }
    let Some(key) = event.key().map(str::to_string) else {
        return;
    };
    if containment.policy().keys.action(&key) == KeyAction::Pass {
        return;
    }
    event.prevent_default();
    event.stop_immediate_propagation();
    containment.handle_signal(EscapeSignal::BlockedKey(key));
}

// Gestures

fn on_gesture(containment: &Containment, event: &mut Event) {
    if !containment.is_locked() {
        return;
    }
    let kind = match event.event_type {
        EventType::ContextMenu => GestureKind::ContextMenu,
        EventType::DblClick => GestureKind::DoubleClick,
        EventType::DragStart => GestureKind::DragStart,
        _ => return,
    };
    event.prevent_default();
    event.stop_immediate_propagation();
    containment.handle_signal(EscapeSignal::Gesture(kind));
}

/// Touch start/end pair measuring hold time on the window clock.
fn watch_long_press(window: &Arc<Window>, containment: &Weak<Containment>) -> [Subscription; 2] {
    let pressed_at: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));

    let start = {
        let containment = containment.clone();
        let pressed_at = pressed_at.clone();
        window.add_event_listener(
            ListenerScope::Window,
            EventType::TouchStart,
            Arc::new(move |event: &mut Event| {
                if containment.upgrade().is_some() {
                    *pressed_at.lock() = Some(event.timestamp);
                }
            }),
            EventListenerOptions::capture(),
        )
    };

    let end = {
        let containment = containment.clone();
        window.add_event_listener(
            ListenerScope::Window,
            EventType::TouchEnd,
            Arc::new(move |event: &mut Event| {
                let Some(containment) = containment.upgrade() else {
                    return;
                };
                let Some(started) = pressed_at.lock().take() else {
                    return;
                };
                if !containment.is_locked() {
                    return;
                }
                let held_ms = event.timestamp - started;
                if held_ms >= containment.policy().long_press.as_secs_f64() * 1000.0 {
                    event.prevent_default();
                    event.stop_immediate_propagation();
                    containment.handle_signal(EscapeSignal::Gesture(GestureKind::LongPress));
                }
            }),
            EventListenerOptions::capture(),
        )
    };

    [
        Subscription::listener(window, start, "touch-start"),
        Subscription::listener(window, end, "touch-end"),
    ]
}

// Focus and visibility

fn on_visibility(containment: &Containment, event: &mut Event) {
    if let EventDetail::Visibility { hidden: true } = event.detail {
        containment.handle_signal(EscapeSignal::VisibilityHidden);
    }
}

fn on_blur(containment: &Containment, _event: &mut Event) {
    containment.handle_signal(EscapeSignal::Blur);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::EscapeReason;
    use dom::{AttributeMap, MessageData};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    struct Fixture {
        window: Arc<Window>,
        containment: Arc<Containment>,
        escapes: Arc<Mutex<Vec<EscapeReason>>>,
    }

    fn fixture_with(policy: ContainmentPolicy) -> Fixture {
        let window = Arc::new(Window::new(Url::parse("https://app.example/watch").unwrap()));
        let containment = Containment::new(window.clone(), policy).unwrap();
        containment.initialize().unwrap();
        let escapes = Arc::new(Mutex::new(Vec::new()));
        let sink = escapes.clone();
        containment.register_reaction(Arc::new(move |reason| {
            sink.lock().push(reason.clone());
            Ok(())
        }));
        Fixture {
            window,
            containment,
            escapes,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ContainmentPolicy::default())
    }

    /// A bubbling listener standing in for the embedded widget's own handler.
    fn widget_listener(window: &Window, event_type: EventType) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        window.add_event_listener(
            ListenerScope::Window,
            event_type,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            EventListenerOptions::default(),
        );
        hits
    }

    fn text(s: &str) -> MessageData {
        MessageData::Text(s.to_string())
    }

    #[test]
    fn test_untrusted_message_stopped_while_locked() {
        let f = fixture();
        let widget = widget_listener(&f.window, EventType::Message);
        f.containment.lock();

        let event = f
            .window
            .receive_message("https://evil.example", text(r#"{"event":"navigate_out"}"#));
        assert!(event.immediate_propagation_stopped);
        assert_eq!(widget.load(Ordering::SeqCst), 0);
        assert_eq!(
            *f.escapes.lock(),
            vec![EscapeReason::UntrustedOrigin {
                origin: "https://evil.example".into()
            }]
        );
    }

    #[test]
    fn test_safe_message_passes_through() {
        let f = fixture();
        let widget = widget_listener(&f.window, EventType::Message);
        f.containment.lock();

        let event = f
            .window
            .receive_message("https://www.youtube.com", text(r#"{"event":"onStateChange","info":1}"#));
        assert!(!event.propagation_stopped);
        assert_eq!(widget.load(Ordering::SeqCst), 1);
        assert!(f.escapes.lock().is_empty());
    }

    #[test]
    fn test_untrusted_message_ignored_while_unlocked() {
        let f = fixture();
        f.window.receive_message("https://evil.example", text("{}"));
        assert!(f.escapes.lock().is_empty());
    }

    #[test]
    fn test_back_navigation_absorbed() {
        let f = fixture();
        f.containment.lock();
        let route = f.window.location().href;
        let depth = f.window.history_length();

        assert!(!f.window.navigate_back());
        assert!(!f.window.navigate_back());
        assert_eq!(f.window.location().href, route);
        assert!(f.window.history_length() >= depth);
        assert_eq!(f.escapes.lock().len(), 2);
    }

    #[test]
    fn test_popup_blocked_only_while_locked() {
        let f = fixture();
        assert!(f.window.open("https://www.youtube.com/", "_blank").is_some());

        f.containment.lock();
        assert!(f.window.open("https://www.youtube.com/", "_blank").is_none());
        assert!(matches!(
            f.escapes.lock().as_slice(),
            [EscapeReason::PopupBlocked { .. }]
        ));
    }

    #[test]
    fn test_blank_targets_stripped_now_and_later() {
        let window = Arc::new(Window::new(Url::parse("https://app.example/").unwrap()));
        let doc = window.document().clone();
        let early = doc.create_element(
            "a",
            AttributeMap::from_pairs([("href", "/about"), ("target", "_blank")]),
        );

        let containment = Containment::new(window.clone(), ContainmentPolicy::default()).unwrap();
        containment.initialize().unwrap();
        assert_eq!(doc.get_attribute(early, "target"), None);

        let late = doc.create_element(
            "a",
            AttributeMap::from_pairs([("href", "https://elsewhere.example/"), ("target", "_BLANK")]),
        );
        assert_eq!(doc.get_attribute(late, "target"), None);

        doc.set_attribute(early, "target", "_blank").unwrap();
        assert_eq!(doc.get_attribute(early, "target"), None);

        // Other targets are left alone.
        doc.set_attribute(early, "target", "_self").unwrap();
        assert_eq!(doc.get_attribute(early, "target").as_deref(), Some("_self"));
    }

    #[test]
    fn test_cross_origin_link_suppressed_while_locked() {
        let f = fixture();
        let doc = f.window.document();
        let external = doc.create_element(
            "a",
            AttributeMap::from_pairs([("href", "https://www.youtube.com/watch?v=other")]),
        );
        let internal = doc.create_element("a", AttributeMap::from_pairs([("href", "/library")]));
        f.containment.lock();

        let event = f.window.click(external);
        assert!(event.default_prevented);
        assert_eq!(f.window.location().host, "app.example");
        assert!(matches!(
            f.escapes.lock().as_slice(),
            [EscapeReason::ExternalLink { .. }]
        ));

        f.window.click(internal);
        assert_eq!(f.window.location().pathname, "/library");
        assert_eq!(f.escapes.lock().len(), 1);
    }

    #[test]
    fn test_fullscreen_request_refused_and_forced_exit() {
        let f = fixture();
        let player = f.window.document().create_element("div", AttributeMap::new());
        f.containment.lock();

        assert!(matches!(
            f.window.request_fullscreen(player),
            Err(DomError::FullscreenDenied(_))
        ));
        assert_eq!(f.window.fullscreen_element(), None);

        // Vendor path bypasses the request hook; the change listener exits.
        f.window.enter_fullscreen(player);
        assert_eq!(f.window.fullscreen_element(), None);
        assert_eq!(f.escapes.lock().as_slice(), [EscapeReason::FullscreenRequest]);
    }

    #[test]
    fn test_player_keys_swallowed() {
        let f = fixture();
        let widget = widget_listener(&f.window, EventType::KeyDown);
        f.containment.lock();

        let event = f.window.key_down("f", None);
        assert!(event.default_prevented);
        assert_eq!(widget.load(Ordering::SeqCst), 0);
        assert!(f.escapes.lock().is_empty());

        let event = f.window.key_down("Escape", None);
        assert!(event.default_prevented);
        assert_eq!(f.escapes.lock().as_slice(), [EscapeReason::EscapeKey]);

        f.window.key_down("a", None);
        assert_eq!(widget.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gestures_suppressed_without_escape() {
        let f = fixture();
        let node = f.window.document().create_element("div", AttributeMap::new());
        f.containment.lock();

        for kind in [EventType::ContextMenu, EventType::DblClick, EventType::DragStart] {
            let event = f.window.fire(kind, Some(node));
            assert!(event.default_prevented);
        }

        f.window.fire(EventType::TouchStart, Some(node));
        f.window.advance(Duration::from_millis(200));
        let short = f.window.fire(EventType::TouchEnd, Some(node));
        assert!(!short.default_prevented);

        f.window.fire(EventType::TouchStart, Some(node));
        f.window.advance(Duration::from_millis(650));
        let long = f.window.fire(EventType::TouchEnd, Some(node));
        assert!(long.default_prevented);

        assert!(f.escapes.lock().is_empty());
    }

    #[test]
    fn test_visibility_hidden_escapes_only_while_playing() {
        let f = fixture();
        f.containment.lock();
        f.containment.set_playing(false);
        f.window.set_hidden(true);
        assert!(f.escapes.lock().is_empty());

        f.window.set_hidden(false);
        f.containment.set_playing(true);
        f.window.set_hidden(true);
        assert_eq!(f.escapes.lock().as_slice(), [EscapeReason::VisibilityHidden]);
    }

    #[test]
    fn test_blur_listener_only_when_enabled() {
        let f = fixture();
        f.containment.lock();
        f.window.blur();
        assert!(f.escapes.lock().is_empty());
        assert_eq!(f.window.listener_count(&EventType::Blur), 0);

        let f = fixture_with(ContainmentPolicy::default().with_flags(InterceptFlags::all()));
        f.containment.lock();
        f.window.blur();
        assert_eq!(f.escapes.lock().as_slice(), [EscapeReason::FocusLoss]);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let f = fixture();
        f.containment.lock();
        f.containment.teardown();

        assert_eq!(f.window.total_listeners(), 0);
        assert!(!f.window.has_open_interceptor());
        assert!(!f.window.has_fullscreen_interceptor());
        assert_eq!(f.window.document().observer_count(), 0);

        let seen = f.containment.classified_count();
        assert!(f.window.navigate_back());
        f.window.key_down("Escape", None);
        f.window.receive_message("https://evil.example", text("{}"));
        assert_eq!(f.containment.classified_count(), seen);
        assert!(f.escapes.lock().is_empty());
    }
}
