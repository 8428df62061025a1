//! Hooks on window entry points that dispatch no event of their own.
//!
//! `open` and the standard fullscreen request cannot be intercepted in the
//! capture phase, so they are guarded by interceptors installed on the window.
//! Each guard remembers whatever hook was there before and puts it back when
//! disposed.

use crate::subscription::Subscription;
use dom::{FullscreenInterceptor, OpenInterceptor, Window};
use std::sync::{Arc, Weak};

/// Install an open interceptor for the lifetime of the returned subscription.
pub fn guard_open(window: &Arc<Window>, interceptor: OpenInterceptor) -> Subscription {
    let previous = window.set_open_interceptor(Some(interceptor));
    let window: Weak<Window> = Arc::downgrade(window);
    Subscription::new("popup-guard", move || {
        if let Some(window) = window.upgrade() {
            window.set_open_interceptor(previous);
        }
    })
}

/// Install a fullscreen interceptor for the lifetime of the returned subscription.
pub fn guard_fullscreen(window: &Arc<Window>, interceptor: FullscreenInterceptor) -> Subscription {
    let previous = window.set_fullscreen_interceptor(Some(interceptor));
    let window: Weak<Window> = Arc::downgrade(window);
    Subscription::new("fullscreen-guard", move || {
        if let Some(window) = window.upgrade() {
            window.set_fullscreen_interceptor(previous);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{DomError, OpenDisposition};
    use url::Url;

    fn window() -> Arc<Window> {
        Arc::new(Window::new(Url::parse("https://app.example/").unwrap()))
    }

    #[test]
    fn test_open_guard_restores_previous_hook() {
        let window = window();
        window.set_open_interceptor(Some(Arc::new(|_, _| OpenDisposition::Allow)));

        let mut guard = guard_open(&window, Arc::new(|_, _| OpenDisposition::Block));
        assert!(window.open("https://elsewhere.example/", "_blank").is_none());

        guard.dispose();
        assert!(window.has_open_interceptor());
        assert!(window.open("https://elsewhere.example/", "_blank").is_some());
    }

    #[test]
    fn test_fullscreen_guard_clears_on_drop() {
        let window = window();
        let node = window
            .document()
            .create_element("div", Default::default());
        {
            let _guard = guard_fullscreen(
                &window,
                Arc::new(|_| Err(DomError::FullscreenDenied("locked".into()))),
            );
            assert!(window.request_fullscreen(node).is_err());
        }
        assert!(!window.has_fullscreen_interceptor());
        assert!(window.request_fullscreen(node).is_ok());
    }
}
