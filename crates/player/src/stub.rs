//! Scripted in-process widget.
//!
//! Answers commands the way the real frame does, by posting state-change
//! messages back to the window from the embed origin. Playback position
//! follows the window clock.

use crate::error::{PlayerError, PlayerResult};
use crate::vars::PlayerVars;
use crate::widget::{EmbeddedWidget, WidgetEvent, WidgetPlayback};
use dom::{
    AttributeMap, EventListenerOptions, EventType, ListenerId, ListenerScope, NodeId, TimerId,
    Window,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default origin the stub posts from.
pub const STUB_ORIGIN: &str = "https://www.youtube-nocookie.com";

/// A command as the stub received it.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetCommand {
    Load { video_id: String, vars: PlayerVars },
    Play,
    Pause,
    Seek(Duration),
    Mute(bool),
    Destroy,
}

#[derive(Debug, Default)]
struct Clock {
    base: Duration,
    playing_since: Option<Duration>,
}

/// Scripted widget for tests and the simulator.
pub struct StubWidget {
    window: Weak<Window>,
    origin: String,
    frame: NodeId,
    duration: RwLock<Option<Duration>>,
    clock: Mutex<Clock>,
    end_timer: Mutex<Option<TimerId>>,
    shortcut_listener: Mutex<Option<ListenerId>>,
    commands: Mutex<Vec<WidgetCommand>>,
    auto_ready: AtomicBool,
    respond: AtomicBool,
    fail_commands: AtomicBool,
    this: Weak<StubWidget>,
}

impl StubWidget {
    /// A stub that becomes ready immediately on load.
    pub fn new(window: &Arc<Window>, duration: Duration) -> Arc<Self> {
        let frame = window.document().create_element(
            "iframe",
            AttributeMap::from_pairs([("title", "embedded player")]),
        );
        Arc::new_cyclic(|this| Self {
            window: Arc::downgrade(window),
            origin: STUB_ORIGIN.to_string(),
            frame,
            duration: RwLock::new(Some(duration)),
            clock: Mutex::new(Clock::default()),
            end_timer: Mutex::new(None),
            shortcut_listener: Mutex::new(None),
            commands: Mutex::new(Vec::new()),
            auto_ready: AtomicBool::new(true),
            respond: AtomicBool::new(true),
            fail_commands: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    /// Do not report ready on load; the test decides when (or whether).
    pub fn with_manual_ready(self: Arc<Self>) -> Arc<Self> {
        self.auto_ready.store(false, Ordering::SeqCst);
        self
    }

    /// Accept commands without posting state changes back.
    pub fn set_silent(&self, silent: bool) {
        self.respond.store(!silent, Ordering::SeqCst);
    }

    /// Make every subsequent command fail.
    pub fn set_failing(&self, failing: bool) {
        self.fail_commands.store(failing, Ordering::SeqCst);
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The frame element hosting the widget.
    pub fn frame(&self) -> NodeId {
        self.frame
    }

    pub fn commands(&self) -> Vec<WidgetCommand> {
        self.commands.lock().clone()
    }

    /// Post a notification to the window from the embed origin.
    pub fn emit(&self, event: WidgetEvent) {
        if let Some(window) = self.window.upgrade() {
            window.receive_message(&self.origin, event.to_message());
        }
    }

    /// Bind the widget's own keyboard shortcuts. `f` asks for native
    /// fullscreen, the way the real frame does when its shortcuts are live.
    pub fn bind_shortcuts(&self) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        let weak_window = self.window.clone();
        let frame = self.frame;
        let id = window.add_event_listener(
            ListenerScope::Window,
            EventType::KeyDown,
            Arc::new(move |event| {
                let Some(window) = weak_window.upgrade() else {
                    return;
                };
                if event.key().map_or(false, |k| k.eq_ignore_ascii_case("f")) {
                    if let Err(err) = window.request_fullscreen(frame) {
                        tracing::debug!("widget fullscreen refused: {}", err);
                    }
                }
            }),
            EventListenerOptions::default(),
        );
        *self.shortcut_listener.lock() = Some(id);
    }

    fn record(&self, command: WidgetCommand) -> PlayerResult<()> {
        self.commands.lock().push(command);
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(PlayerError::Command("widget unavailable".to_string()));
        }
        Ok(())
    }

    fn responding(&self) -> bool {
        self.respond.load(Ordering::SeqCst)
    }

    fn now(&self) -> Duration {
        self.window.upgrade().map(|w| w.now()).unwrap_or_default()
    }

    fn position_at(&self, now: Duration) -> Duration {
        let clock = self.clock.lock();
        let position = match clock.playing_since {
            Some(since) => clock.base + now.saturating_sub(since),
            None => clock.base,
        };
        match *self.duration.read() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn clear_end_timer(&self) {
        if let (Some(id), Some(window)) = (self.end_timer.lock().take(), self.window.upgrade()) {
            window.clear_timer(id);
        }
    }

    fn schedule_end(&self) {
        self.clear_end_timer();
        let (Some(window), Some(duration)) = (self.window.upgrade(), *self.duration.read()) else {
            return;
        };
        let remaining = duration.saturating_sub(self.position_at(window.now()));
        let this = self.this.clone();
        let id = window.set_timeout(
            Arc::new(move || {
                if let Some(stub) = this.upgrade() {
                    stub.finish();
                }
            }),
            remaining,
        );
        *self.end_timer.lock() = Some(id);
    }

    fn finish(&self) {
        let now = self.now();
        let position = self.position_at(now);
        {
            let mut clock = self.clock.lock();
            clock.base = position;
            clock.playing_since = None;
        }
        *self.end_timer.lock() = None;
        self.emit(WidgetEvent::StateChange(WidgetPlayback::Ended));
    }
}

impl EmbeddedWidget for StubWidget {
    fn load(&self, video_id: &str, vars: &PlayerVars) -> PlayerResult<()> {
        self.record(WidgetCommand::Load {
            video_id: video_id.to_string(),
            vars: vars.clone(),
        })?;
        *self.clock.lock() = Clock::default();
        if self.auto_ready.load(Ordering::SeqCst) {
            self.emit(WidgetEvent::Ready);
        }
        Ok(())
    }

    fn play(&self) -> PlayerResult<()> {
        self.record(WidgetCommand::Play)?;
        let now = self.now();
        {
            let mut clock = self.clock.lock();
            if clock.playing_since.is_none() {
                clock.playing_since = Some(now);
            }
        }
        if self.responding() {
            self.schedule_end();
            self.emit(WidgetEvent::StateChange(WidgetPlayback::Playing));
        }
        Ok(())
    }

    fn pause(&self) -> PlayerResult<()> {
        self.record(WidgetCommand::Pause)?;
        let position = self.position_at(self.now());
        {
            let mut clock = self.clock.lock();
            clock.base = position;
            clock.playing_since = None;
        }
        self.clear_end_timer();
        if self.responding() {
            self.emit(WidgetEvent::StateChange(WidgetPlayback::Paused));
        }
        Ok(())
    }

    fn seek_to(&self, position: Duration) -> PlayerResult<()> {
        self.record(WidgetCommand::Seek(position))?;
        let now = self.now();
        let playing = {
            let mut clock = self.clock.lock();
            clock.base = position;
            if clock.playing_since.is_some() {
                clock.playing_since = Some(now);
            }
            clock.playing_since.is_some()
        };
        if playing && self.responding() {
            self.schedule_end();
        }
        Ok(())
    }

    fn set_muted(&self, muted: bool) -> PlayerResult<()> {
        self.record(WidgetCommand::Mute(muted))
    }

    fn current_time(&self) -> Duration {
        self.position_at(self.now())
    }

    fn duration(&self) -> Option<Duration> {
        *self.duration.read()
    }

    fn destroy(&self) {
        self.commands.lock().push(WidgetCommand::Destroy);
        self.clear_end_timer();
        if let (Some(id), Some(window)) =
            (self.shortcut_listener.lock().take(), self.window.upgrade())
        {
            window.remove_event_listener(id);
        }
    }
}

impl std::fmt::Debug for StubWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubWidget")
            .field("origin", &self.origin)
            .field("duration", &*self.duration.read())
            .finish()
    }
}
