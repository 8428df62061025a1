//! Disposers for everything the detector installs.

use dom::{Document, ListenerId, ObserverId, Window};
use std::fmt;
use std::sync::{Arc, Weak};

type Disposer = Box<dyn FnOnce() + Send>;

/// One installed subscription. Disposing releases it; dropping an
/// undisposed subscription disposes it.
pub struct Subscription {
    label: &'static str,
    dispose: Option<Disposer>,
}

impl Subscription {
    pub fn new(label: &'static str, dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Removes a window or node listener.
    pub fn listener(window: &Arc<Window>, id: ListenerId, label: &'static str) -> Self {
        let window: Weak<Window> = Arc::downgrade(window);
        Self::new(label, move || {
            if let Some(window) = window.upgrade() {
                window.remove_event_listener(id);
            }
        })
    }

    /// Disconnects a mutation observer.
    pub fn observer(document: &Arc<Document>, id: ObserverId, label: &'static str) -> Self {
        let document: Weak<Document> = Arc::downgrade(document);
        Self::new(label, move || {
            if let Some(document) = document.upgrade() {
                document.disconnect(id);
            }
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose.is_none()
    }

    /// Release the subscription. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{EventListenerOptions, EventType, ListenerScope};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    #[test]
    fn test_dispose_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let mut sub = Subscription::new("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.dispose();
        sub.dispose();
        drop(sub);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_subscription_removes_listener() {
        let window = Arc::new(Window::new(Url::parse("https://app.example/").unwrap()));
        let id = window.add_event_listener(
            ListenerScope::Window,
            EventType::KeyDown,
            Arc::new(|_| {}),
            EventListenerOptions::capture(),
        );
        let sub = Subscription::listener(&window, id, "keys");
        assert_eq!(window.listener_count(&EventType::KeyDown), 1);
        drop(sub);
        assert_eq!(window.listener_count(&EventType::KeyDown), 0);
    }
}
