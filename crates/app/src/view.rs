//! The playback view.
//!
//! Owns one containment context, the parent gate and the session's escape
//! counter, and wires a `PlayerHost` plus `RecoveryController` together for
//! each mounted video.

use crate::config::AppConfig;
use common::{SafeViewError, SafeViewResult};
use dom::Window;
use gate::{ParentGate, RecoveryController};
use parking_lot::Mutex;
use player::{validate_video_id, EmbeddedWidget, PlayerCallbacks, PlayerError, PlayerHost};
use sandbox::{Containment, EscapeCounter, EscapeReason};
use std::sync::{Arc, Weak};

pub type ViewCallback = Arc<dyn Fn() + Send + Sync>;

/// Notifications for the browsing layer.
#[derive(Clone, Default)]
pub struct ViewCallbacks {
    on_play: Option<ViewCallback>,
    on_pause: Option<ViewCallback>,
    on_ended: Option<ViewCallback>,
    on_back: Option<ViewCallback>,
    on_error: Option<Arc<dyn Fn(&PlayerError) + Send + Sync>>,
    on_escape_attempt: Option<Arc<dyn Fn(&EscapeReason, u64) + Send + Sync>>,
}

impl ViewCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_play(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_play = Some(Arc::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_pause = Some(Arc::new(f));
        self
    }

    pub fn on_ended(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ended = Some(Arc::new(f));
        self
    }

    /// The view returned to browsing.
    pub fn on_back(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_back = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&PlayerError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_escape_attempt(mut self, f: impl Fn(&EscapeReason, u64) + Send + Sync + 'static) -> Self {
        self.on_escape_attempt = Some(Arc::new(f));
        self
    }

    fn player_callbacks(&self) -> PlayerCallbacks {
        let mut callbacks = PlayerCallbacks::new();
        if let Some(f) = self.on_play.clone() {
            callbacks = callbacks.on_play(move || f());
        }
        if let Some(f) = self.on_pause.clone() {
            callbacks = callbacks.on_pause(move || f());
        }
        if let Some(f) = self.on_ended.clone() {
            callbacks = callbacks.on_ended(move || f());
        }
        if let Some(f) = self.on_error.clone() {
            callbacks = callbacks.on_error(move |err| f(err));
        }
        callbacks
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Usage {
    minutes_used: u32,
    minute_of_day: u16,
}

struct Session {
    video_id: String,
    host: Arc<PlayerHost>,
    recovery: Arc<RecoveryController>,
}

/// Mounts and unmounts the player for one video at a time.
pub struct PlaybackView {
    window: Arc<Window>,
    config: AppConfig,
    containment: Arc<Containment>,
    gate: Arc<ParentGate>,
    counter: Arc<EscapeCounter>,
    callbacks: ViewCallbacks,
    session: Mutex<Option<Session>>,
    last_video: Mutex<Option<String>>,
    usage: Mutex<Usage>,
    this: Weak<PlaybackView>,
}

impl PlaybackView {
    pub fn new(
        window: Arc<Window>,
        config: AppConfig,
        callbacks: ViewCallbacks,
    ) -> SafeViewResult<Arc<Self>> {
        let gate = ParentGate::new(config.gate_difficulty, config.wrong_answer_policy);
        Self::with_gate(window, config, callbacks, gate)
    }

    /// Use a prepared gate, e.g. one with a seeded generator.
    pub fn with_gate(
        window: Arc<Window>,
        config: AppConfig,
        callbacks: ViewCallbacks,
        gate: ParentGate,
    ) -> SafeViewResult<Arc<Self>> {
        config.validate()?;
        let containment = Containment::new(window.clone(), config.containment_policy())?;
        Ok(Arc::new_cyclic(|this| Self {
            window,
            config,
            containment,
            gate: Arc::new(gate),
            counter: Arc::new(EscapeCounter::new()),
            callbacks,
            session: Mutex::new(None),
            last_video: Mutex::new(None),
            usage: Mutex::new(Usage::default()),
            this: this.clone(),
        }))
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn containment(&self) -> &Arc<Containment> {
        &self.containment
    }

    pub fn gate(&self) -> &Arc<ParentGate> {
        &self.gate
    }

    pub fn escape_attempts(&self) -> u64 {
        self.counter.get()
    }

    pub fn host(&self) -> Option<Arc<PlayerHost>> {
        self.session.lock().as_ref().map(|s| s.host.clone())
    }

    pub fn current_video(&self) -> Option<String> {
        self.session.lock().as_ref().map(|s| s.video_id.clone())
    }

    /// Nothing mounted.
    pub fn is_browsing(&self) -> bool {
        self.session.lock().is_none()
    }

    /// Feed today's usage into the screen-time check.
    pub fn set_screen_time_usage(&self, minutes_used: u32, minute_of_day: u16) {
        *self.usage.lock() = Usage {
            minutes_used,
            minute_of_day,
        };
    }

    /// Mount the player for `video_id`. Replaces any mounted video.
    pub fn mount(
        &self,
        video_id: &str,
        widget: Arc<dyn EmbeddedWidget>,
    ) -> SafeViewResult<Arc<PlayerHost>> {
        self.mount_with_autoplay(video_id, widget, self.config.autoplay)
    }

    /// Like `mount`, overriding the configured autoplay for this video only.
    pub fn mount_with_autoplay(
        &self,
        video_id: &str,
        widget: Arc<dyn EmbeddedWidget>,
        autoplay: bool,
    ) -> SafeViewResult<Arc<PlayerHost>> {
        if let Some(policy) = &self.config.screen_time {
            let usage = *self.usage.lock();
            policy.check(usage.minutes_used, usage.minute_of_day)?;
        }
        validate_video_id(video_id)?;
        self.release();

        {
            let mut last = self.last_video.lock();
            if last.as_deref() != Some(video_id) {
                self.counter.reset();
                *last = Some(video_id.to_string());
            }
        }

        self.containment.initialize()?;
        // Contained from mount on; the host marks playing once the widget plays.
        self.containment.lock();
        self.containment.set_playing(false);
        let host = match PlayerHost::mount(
            self.window.clone(),
            self.containment.clone(),
            widget,
            video_id,
            self.config.host_config().with_autoplay(autoplay),
            self.callbacks.player_callbacks(),
        ) {
            Ok(host) => host,
            Err(err) => {
                self.containment.teardown();
                return Err(err.into());
            }
        };

        let recovery = RecoveryController::install(
            self.containment.clone(),
            &host,
            self.gate.clone(),
            self.counter.clone(),
        );
        let view = self.this.clone();
        recovery.on_exit(move || {
            if let Some(view) = view.upgrade() {
                view.exit_to_browsing();
            }
        });
        if let Some(f) = self.callbacks.on_escape_attempt.clone() {
            recovery.on_escape_attempt(move |reason, attempts| f(reason, attempts));
        }

        *self.session.lock() = Some(Session {
            video_id: video_id.to_string(),
            host: host.clone(),
            recovery,
        });
        tracing::info!("mounted {}", video_id);
        Ok(host)
    }

    /// Release the mounted player and every containment subscription, and
    /// end the escape-counting session. Returns false if nothing was mounted.
    pub fn unmount(&self) -> bool {
        let released = self.release();
        self.counter.reset();
        self.last_video.lock().take();
        released
    }

    /// Leave the player for the browsing view.
    pub fn exit_to_browsing(&self) {
        self.unmount();
        if let Some(f) = self.callbacks.on_back.clone() {
            f();
        }
    }

    /// Tear the session down but keep counting for a remount of the same video.
    fn release(&self) -> bool {
        let Some(session) = self.session.lock().take() else {
            return false;
        };
        session.recovery.uninstall();
        session.host.unmount();
        let video_id = session.video_id.clone();
        drop(session);

        // With the controller gone this only closes the modal.
        if self.gate.is_visible() {
            self.gate.cancel();
        }
        self.containment.teardown();
        tracing::info!("unmounted {}", video_id);
        true
    }

    /// Retry a failed load.
    pub fn retry(&self) -> SafeViewResult<()> {
        let host = self
            .host()
            .ok_or_else(|| SafeViewError::player("nothing mounted"))?;
        host.retry()?;
        Ok(())
    }
}

impl Drop for PlaybackView {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for PlaybackView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackView")
            .field("video", &self.current_video())
            .field("containment", &self.containment.snapshot())
            .field("attempts", &self.counter.get())
            .finish()
    }
}
