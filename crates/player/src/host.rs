//! The player host.
//!
//! Wraps an `EmbeddedWidget`, drives the per-video state machine from the
//! widget's messages, keeps shields and the end-of-video cover in place,
//! and reports lifecycle events to the view.

use crate::error::{PlayerError, PlayerResult};
use crate::layout::{PlayerLayout, PointerTarget};
use crate::state::{HostConfig, PlayerState, Progress};
use crate::vars::{validate_video_id, PlayerVars};
use crate::widget::{EmbeddedWidget, WidgetEvent, WidgetPlayback};
use common::{Point, Size};
use dom::{
    Event, EventDetail, EventListenerOptions, EventType, ListenerId, ListenerScope,
    OrientationLock, TimerId, Window,
};
use parking_lot::{Mutex, RwLock};
use sandbox::Containment;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&PlayerError) + Send + Sync>;

/// Lifecycle notifications delivered to the view.
#[derive(Clone, Default)]
pub struct PlayerCallbacks {
    on_ready: Option<LifecycleCallback>,
    on_play: Option<LifecycleCallback>,
    on_pause: Option<LifecycleCallback>,
    on_ended: Option<LifecycleCallback>,
    on_error: Option<ErrorCallback>,
}

impl PlayerCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ready(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Arc::new(f));
        self
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

    pub fn on_error(mut self, f: impl Fn(&PlayerError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

fn notify(name: &str, callback: &Option<LifecycleCallback>) {
    if let Some(callback) = callback {
        if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
            tracing::error!("{} callback panicked", name);
        }
    }
}

/// The mounted player for one video.
pub struct PlayerHost {
    window: Arc<Window>,
    containment: Arc<Containment>,
    widget: Arc<dyn EmbeddedWidget>,
    video_id: String,
    vars: PlayerVars,
    config: HostConfig,
    callbacks: PlayerCallbacks,
    state: RwLock<PlayerState>,
    progress: RwLock<Progress>,
    layout: RwLock<PlayerLayout>,
    muted: AtomicBool,
    dragging: AtomicBool,
    started: AtomicBool,
    mounted: AtomicBool,
    load_timer: Mutex<Option<TimerId>>,
    poll_timer: Mutex<Option<TimerId>>,
    message_listener: Mutex<Option<ListenerId>>,
    this: Weak<PlayerHost>,
}

impl PlayerHost {
    /// Mount the widget for `video_id` and start loading it.
    pub fn mount(
        window: Arc<Window>,
        containment: Arc<Containment>,
        widget: Arc<dyn EmbeddedWidget>,
        video_id: &str,
        config: HostConfig,
        callbacks: PlayerCallbacks,
    ) -> PlayerResult<Arc<Self>> {
        validate_video_id(video_id)?;
        let vars = PlayerVars::minimal_chrome(&window.origin()).with_autoplay(config.autoplay);
        let screen = window.screen();
        let layout = PlayerLayout::new(Size::new(screen.width as f32, screen.height as f32));

        let host = Arc::new_cyclic(|this| Self {
            window,
            containment,
            widget,
            video_id: video_id.to_string(),
            vars,
            config,
            callbacks,
            state: RwLock::new(PlayerState::Initializing),
            progress: RwLock::new(Progress::default()),
            layout: RwLock::new(layout),
            muted: AtomicBool::new(false),
            dragging: AtomicBool::new(false),
            started: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
            load_timer: Mutex::new(None),
            poll_timer: Mutex::new(None),
            message_listener: Mutex::new(None),
            this: this.clone(),
        });

        host.listen_for_widget();
        tracing::info!("mounting player for {}", host.video_id);
        host.begin_load();
        Ok(host)
    }

    // Accessors

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn vars(&self) -> &PlayerVars {
        &self.vars
    }

    pub fn state(&self) -> PlayerState {
        self.state.read().clone()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.read()
    }

    pub fn layout(&self) -> PlayerLayout {
        *self.layout.read()
    }

    pub fn is_pseudo_fullscreen(&self) -> bool {
        self.layout.read().is_pseudo_fullscreen()
    }

    pub fn is_end_screen_visible(&self) -> bool {
        self.layout.read().is_end_screen_visible()
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn is_polling(&self) -> bool {
        self.poll_timer.lock().is_some()
    }

    // Loading

    fn listen_for_widget(&self) {
        let this = self.this.clone();
        let id = self.window.add_event_listener(
            ListenerScope::Window,
            EventType::Message,
            Arc::new(move |event: &mut Event| {
                let Some(host) = this.upgrade() else {
                    return;
                };
                let EventDetail::Message { origin, data } = &event.detail else {
                    return;
                };
                if !host.containment.policy().origins.allows(origin) {
                    return;
                }
                if let Some(widget_event) = WidgetEvent::parse(data) {
                    host.on_widget_event(widget_event);
                }
            }),
            EventListenerOptions::default(),
        );
        *self.message_listener.lock() = Some(id);
    }

    fn begin_load(&self) {
        *self.state.write() = PlayerState::Initializing;
        *self.progress.write() = Progress::default();
        self.layout.write().set_end_screen(false);

        // Armed before loading: a widget may report ready synchronously.
        let this = self.this.clone();
        let timer = self.window.set_timeout(
            Arc::new(move || {
                if let Some(host) = this.upgrade() {
                    host.on_load_timeout();
                }
            }),
            self.config.load_timeout,
        );
        *self.load_timer.lock() = Some(timer);

        if let Err(err) = self.widget.load(&self.video_id, &self.vars) {
            self.fail(err);
        }
    }

    fn clear_load_timer(&self) {
        if let Some(id) = self.load_timer.lock().take() {
            self.window.clear_timer(id);
        }
    }

    fn on_load_timeout(&self) {
        self.load_timer.lock().take();
        if *self.state.read() == PlayerState::Initializing {
            self.fail(PlayerError::LoadTimeout(self.config.load_timeout));
        }
    }

    /// Reload after an error.
    pub fn retry(&self) -> PlayerResult<()> {
        {
            let mut state = self.state.write();
            if !state.is_error() {
                return Err(PlayerError::InvalidState {
                    action: "retry",
                    state: state.to_string(),
                });
            }
            *state = PlayerState::Retrying;
        }
        tracing::info!("retrying {}", self.video_id);
        self.begin_load();
        Ok(())
    }

    // Widget events

    fn on_widget_event(&self, event: WidgetEvent) {
        if !self.is_mounted() {
            return;
        }
        match event {
            WidgetEvent::Ready => self.enter_ready(),
            WidgetEvent::StateChange(WidgetPlayback::Playing) => self.enter_playing(),
            WidgetEvent::StateChange(WidgetPlayback::Paused) => self.enter_paused(),
            WidgetEvent::StateChange(WidgetPlayback::Ended) => self.enter_ended(),
            WidgetEvent::StateChange(other) => {
                tracing::debug!("widget state {:?} ignored", other);
            }
            WidgetEvent::Error(code) => self.fail(PlayerError::from_widget_code(code)),
            WidgetEvent::Progress { current, duration } => self.update_progress(current, duration),
        }
    }

    fn enter_ready(&self) {
        {
            let mut state = self.state.write();
            if *state != PlayerState::Initializing {
                tracing::debug!("ready while {}; ignored", *state);
                return;
            }
            *state = PlayerState::Ready;
        }
        self.clear_load_timer();
        tracing::info!("player ready for {}", self.video_id);
        notify("onReady", &self.callbacks.on_ready);

        if self.config.autoplay {
            if let Err(err) = self.play() {
                tracing::warn!("autoplay failed: {}", err);
            }
        }
    }

    fn enter_playing(&self) {
        let first = {
            let mut state = self.state.write();
            match *state {
                PlayerState::Ready | PlayerState::Paused | PlayerState::Ended => {}
                PlayerState::Playing => return,
                _ => {
                    tracing::debug!("playing while {}; ignored", *state);
                    return;
                }
            }
            *state = PlayerState::Playing;
            !self.started.swap(true, Ordering::SeqCst)
        };

        if first {
            self.enter_pseudo_fullscreen();
        }
        if self.containment.is_locked() {
            self.containment.set_playing(true);
        } else {
            self.containment.lock();
        }
        self.start_polling();
        notify("onPlay", &self.callbacks.on_play);
    }

    fn enter_paused(&self) {
        {
            let mut state = self.state.write();
            if *state != PlayerState::Playing {
                return;
            }
            *state = PlayerState::Paused;
        }
        self.containment.set_playing(false);
        self.stop_polling();
        notify("onPause", &self.callbacks.on_pause);
    }

    fn enter_ended(&self) {
        {
            let mut state = self.state.write();
            if !matches!(*state, PlayerState::Playing | PlayerState::Paused) {
                return;
            }
            *state = PlayerState::Ended;
        }
        self.containment.set_playing(false);
        self.stop_polling();
        {
            let mut progress = self.progress.write();
            if let Some(duration) = progress.duration.or_else(|| self.widget.duration()) {
                progress.current = duration;
                progress.duration = Some(duration);
            }
        }
        self.layout.write().set_end_screen(true);
        tracing::info!("{} ended", self.video_id);
        notify("onEnded", &self.callbacks.on_ended);
    }

    fn fail(&self, err: PlayerError) {
        {
            let mut state = self.state.write();
            if state.is_error() {
                return;
            }
            *state = PlayerState::Error(err.clone());
        }
        self.clear_load_timer();
        self.stop_polling();
        self.containment.set_playing(false);
        tracing::error!("player error for {}: {}", self.video_id, err);

        if let Some(callback) = &self.callbacks.on_error {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&err))).is_err() {
                tracing::error!("onError callback panicked");
            }
        }
    }

    // Layout

    fn enter_pseudo_fullscreen(&self) {
        self.layout.write().enter_pseudo_fullscreen();
        tracing::debug!("entered pseudo-fullscreen");

        if self.config.lock_orientation {
            if let Err(err) = self.window.lock_orientation(OrientationLock::Landscape) {
                tracing::debug!("orientation lock unavailable: {}", err);
            }
        }
    }

    pub fn exit_pseudo_fullscreen(&self) {
        self.layout.write().exit_pseudo_fullscreen();
        self.window.unlock_orientation();
    }

    /// Viewport resize, e.g. after rotation.
    pub fn resize(&self, viewport: Size) {
        self.layout.write().set_viewport(viewport);
    }

    /// Route a pointer press. Shields and the control bar absorb it.
    pub fn pointer_down(&self, point: Point) -> PointerTarget {
        let target = self.layout.read().hit_test(point);
        if let PointerTarget::Shield(kind) = target {
            tracing::debug!("pointer absorbed by {:?} shield", kind);
        }
        target
    }

    // Controls

    pub fn play(&self) -> PlayerResult<()> {
        let state = self.state();
        match state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Ended => {
                self.widget.seek_to(Duration::ZERO)?;
                self.update_progress(Duration::ZERO, None);
            }
            PlayerState::Ready | PlayerState::Paused => {}
            PlayerState::Initializing | PlayerState::Retrying => return Err(PlayerError::NotReady),
            PlayerState::Error(_) => {
                return Err(PlayerError::InvalidState {
                    action: "play",
                    state: state.to_string(),
                })
            }
        }
        self.widget.play()
    }

    /// Pause if playing; otherwise nothing to do.
    pub fn pause(&self) -> PlayerResult<()> {
        if !self.is_mounted() {
            return Err(PlayerError::Unmounted);
        }
        if *self.state.read() != PlayerState::Playing {
            return Ok(());
        }
        self.widget.pause()
    }

    pub fn toggle_play(&self) -> PlayerResult<()> {
        if *self.state.read() == PlayerState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn seek(&self, position: Duration) -> PlayerResult<()> {
        let state = self.state();
        if !state.accepts_commands() {
            return Err(PlayerError::InvalidState {
                action: "seek",
                state: state.to_string(),
            });
        }
        let position = match self.widget.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.widget.seek_to(position)?;
        self.update_progress(position, None);
        Ok(())
    }

    pub fn set_muted(&self, muted: bool) -> PlayerResult<()> {
        self.widget.set_muted(muted)?;
        self.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    pub fn toggle_mute(&self) -> PlayerResult<()> {
        self.set_muted(!self.is_muted())
    }

    /// The seek bar thumb is being dragged; polling pauses so it does not fight the thumb.
    pub fn begin_drag(&self) {
        self.dragging.store(true, Ordering::SeqCst);
        self.stop_polling();
    }

    pub fn end_drag(&self, position: Duration) -> PlayerResult<()> {
        self.dragging.store(false, Ordering::SeqCst);
        let result = self.seek(position);
        self.start_polling();
        result
    }

    // Progress polling

    fn start_polling(&self) {
        if self.dragging.load(Ordering::SeqCst) || *self.state.read() != PlayerState::Playing {
            return;
        }
        let mut timer = self.poll_timer.lock();
        if timer.is_some() {
            return;
        }
        let this = self.this.clone();
        *timer = Some(self.window.set_interval(
            Arc::new(move || {
                if let Some(host) = this.upgrade() {
                    host.poll();
                }
            }),
            self.config.poll_interval,
        ));
    }

    fn stop_polling(&self) {
        if let Some(id) = self.poll_timer.lock().take() {
            self.window.clear_timer(id);
        }
    }

    fn poll(&self) {
        if self.dragging.load(Ordering::SeqCst) || *self.state.read() != PlayerState::Playing {
            self.stop_polling();
            return;
        }
        let current = self.widget.current_time();
        let duration = self.widget.duration();
        self.update_progress(current, duration);
    }

    fn update_progress(&self, current: Duration, duration: Option<Duration>) {
        let near_end = {
            let mut progress = self.progress.write();
            progress.current = current;
            if duration.is_some() {
                progress.duration = duration;
            }
            progress.near_end(self.config.end_overlay_threshold)
        };

        let mut layout = self.layout.write();
        if layout.is_end_screen_visible() != near_end {
            tracing::debug!("end-of-video cover {}", if near_end { "shown" } else { "hidden" });
            layout.set_end_screen(near_end);
        }
    }

    // Teardown

    /// Release timers, the widget and the message listener. Idempotent.
    pub fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        self.clear_load_timer();
        self.stop_polling();
        if let Some(id) = self.message_listener.lock().take() {
            self.window.remove_event_listener(id);
        }
        self.widget.destroy();
        self.exit_pseudo_fullscreen();
        self.containment.set_playing(false);
        tracing::info!("unmounted player for {}", self.video_id);
    }
}

impl Drop for PlayerHost {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for PlayerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHost")
            .field("video_id", &self.video_id)
            .field("state", &*self.state.read())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
