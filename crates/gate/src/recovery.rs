//! Recovery after an escape attempt.
//!
//! Registered as a containment reaction. An escape pauses the player,
//! counts the attempt and opens the parent gate; the gate's answer decides
//! between resuming and leaving the player.

use crate::gate::ParentGate;
use parking_lot::Mutex;
use player::{PlayerHost, PlayerState};
use sandbox::{Containment, EscapeCounter, EscapeReason, ReactionHandle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub type RecoveryCallback = Arc<dyn Fn() + Send + Sync>;
pub type EscapeCallback = Arc<dyn Fn(&EscapeReason, u64) + Send + Sync>;

/// How a recovery ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Resumed,
    Exited,
}

#[derive(Default)]
struct Hooks {
    on_escape: Option<EscapeCallback>,
    on_resume: Option<RecoveryCallback>,
    on_exit: Option<RecoveryCallback>,
}

/// Pause, gate, then resume or exit.
pub struct RecoveryController {
    containment: Arc<Containment>,
    host: Weak<PlayerHost>,
    gate: Arc<ParentGate>,
    counter: Arc<EscapeCounter>,
    hooks: Mutex<Hooks>,
    reaction: Mutex<Option<ReactionHandle>>,
    last_outcome: Mutex<Option<RecoveryOutcome>>,
    /// Whether the prompt interrupted playback. Only then does success play again.
    interrupted_playback: AtomicBool,
    this: Weak<RecoveryController>,
}

impl RecoveryController {
    /// Create the controller and register it with `containment`.
    pub fn install(
        containment: Arc<Containment>,
        host: &Arc<PlayerHost>,
        gate: Arc<ParentGate>,
        counter: Arc<EscapeCounter>,
    ) -> Arc<Self> {
        let controller = Arc::new_cyclic(|this| Self {
            containment,
            host: Arc::downgrade(host),
            gate,
            counter,
            hooks: Mutex::new(Hooks::default()),
            reaction: Mutex::new(None),
            last_outcome: Mutex::new(None),
            interrupted_playback: AtomicBool::new(false),
            this: this.clone(),
        });

        let weak = controller.this.clone();
        let handle = controller.containment.register_reaction(Arc::new(move |reason| {
            if let Some(controller) = weak.upgrade() {
                controller.on_escape(reason);
            }
            Ok(())
        }));
        *controller.reaction.lock() = Some(handle);
        controller
    }

    /// Called with the reason and the running attempt count.
    pub fn on_escape_attempt(&self, f: impl Fn(&EscapeReason, u64) + Send + Sync + 'static) {
        self.hooks.lock().on_escape = Some(Arc::new(f));
    }

    pub fn on_resume(&self, f: impl Fn() + Send + Sync + 'static) {
        self.hooks.lock().on_resume = Some(Arc::new(f));
    }

    /// Called after the player is unmounted and containment unlocked.
    pub fn on_exit(&self, f: impl Fn() + Send + Sync + 'static) {
        self.hooks.lock().on_exit = Some(Arc::new(f));
    }

    pub fn gate(&self) -> &Arc<ParentGate> {
        &self.gate
    }

    pub fn counter(&self) -> &Arc<EscapeCounter> {
        &self.counter
    }

    pub fn last_outcome(&self) -> Option<RecoveryOutcome> {
        *self.last_outcome.lock()
    }

    pub fn is_installed(&self) -> bool {
        self.reaction.lock().is_some()
    }

    fn on_escape(&self, reason: &EscapeReason) {
        if let Some(host) = self.host.upgrade() {
            if !self.gate.is_visible() {
                self.interrupted_playback
                    .store(host.state() == PlayerState::Playing, Ordering::SeqCst);
            }
            if let Err(err) = host.pause() {
                tracing::warn!("could not pause after escape attempt: {}", err);
            }
        }
        let attempts = self.counter.increment();
        tracing::info!("escape attempt #{}: {}", attempts, reason);

        let on_escape = self.hooks.lock().on_escape.clone();
        if let Some(callback) = on_escape {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(reason, attempts))).is_err() {
                tracing::error!("escape-attempt callback panicked");
            }
        }

        if self.gate.is_visible() {
            return;
        }
        let weak = self.this.clone();
        self.gate.show_with(move |ok| {
            if let Some(controller) = weak.upgrade() {
                if ok {
                    controller.resume();
                } else {
                    controller.exit();
                }
            }
        });
    }

    fn resume(&self) {
        let replay = self.interrupted_playback.swap(false, Ordering::SeqCst);
        if let Some(host) = self.host.upgrade().filter(|_| replay) {
            if let Err(err) = host.play() {
                tracing::error!("resume after parent gate failed: {}", err);
            }
        }
        *self.last_outcome.lock() = Some(RecoveryOutcome::Resumed);
        let callback = self.hooks.lock().on_resume.clone();
        run_hook("resume", callback);
    }

    fn exit(&self) {
        if let Some(host) = self.host.upgrade() {
            host.unmount();
        }
        self.containment.unlock();
        *self.last_outcome.lock() = Some(RecoveryOutcome::Exited);
        tracing::info!("left the player after parent gate cancel");
        let callback = self.hooks.lock().on_exit.clone();
        run_hook("exit", callback);
    }

    /// Stop reacting to escapes. Idempotent.
    pub fn uninstall(&self) {
        if let Some(handle) = self.reaction.lock().take() {
            handle.unsubscribe();
        }
    }
}

impl Drop for RecoveryController {
    fn drop(&mut self) {
        self.uninstall();
    }
}

impl std::fmt::Debug for RecoveryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryController")
            .field("installed", &self.is_installed())
            .field("attempts", &self.counter.get())
            .field("gate", &self.gate)
            .finish()
    }
}

fn run_hook(name: &str, callback: Option<RecoveryCallback>) {
    if let Some(callback) = callback {
        if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
            tracing::error!("{} callback panicked", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{Difficulty, WrongAnswerPolicy};
    use dom::{Screen, Window};
    use player::{HostConfig, PlayerCallbacks, PlayerState, StubWidget, WidgetCommand};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sandbox::ContainmentPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    struct Fixture {
        _window: Arc<Window>,
        containment: Arc<Containment>,
        stub: Arc<StubWidget>,
        host: Arc<PlayerHost>,
        controller: Arc<RecoveryController>,
    }

    fn fixture() -> Fixture {
        let window = Arc::new(Window::new(Url::parse("https://app.example/watch").unwrap()));
        window.set_screen(Screen::default());
        let containment = Containment::new(window.clone(), ContainmentPolicy::default()).unwrap();
        containment.initialize().unwrap();
        let stub = StubWidget::new(&window, Duration::from_secs(300));
        let host = PlayerHost::mount(
            window.clone(),
            containment.clone(),
            stub.clone(),
            "abc12345678",
            HostConfig::desktop(),
            PlayerCallbacks::new(),
        )
        .unwrap();
        let gate = Arc::new(ParentGate::with_rng(
            Difficulty::Standard,
            WrongAnswerPolicy::Regenerate,
            StdRng::seed_from_u64(1),
        ));
        let controller = RecoveryController::install(
            containment.clone(),
            &host,
            gate,
            Arc::new(EscapeCounter::new()),
        );
        Fixture {
            _window: window,
            containment,
            stub,
            host,
            controller,
        }
    }

    fn solve(gate: &ParentGate) {
        let answer = gate.challenge().unwrap().answer().to_string();
        gate.submit(&answer);
    }

    #[test]
    fn test_escape_pauses_counts_and_shows_gate() {
        let f = fixture();
        assert_eq!(f.host.state(), PlayerState::Playing);

        f.containment.trigger_escape(&EscapeReason::HistoryPop);
        assert_eq!(f.host.state(), PlayerState::Paused);
        assert_eq!(f.controller.counter().get(), 1);
        assert!(f.controller.gate().is_visible());
        assert!(f.containment.is_locked());
        assert!(!f.containment.is_playing());
    }

    #[test]
    fn test_gate_success_resumes() {
        let f = fixture();
        let resumed = Arc::new(AtomicUsize::new(0));
        let hits = resumed.clone();
        f.controller.on_resume(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        f.containment.trigger_escape(&EscapeReason::EscapeKey);
        solve(f.controller.gate());

        assert!(!f.controller.gate().is_visible());
        assert_eq!(f.host.state(), PlayerState::Playing);
        assert!(f.containment.is_locked() && f.containment.is_playing());
        assert_eq!(f.controller.last_outcome(), Some(RecoveryOutcome::Resumed));
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_success_before_playback_stays_ready() {
        let window = Arc::new(Window::new(Url::parse("https://app.example/watch").unwrap()));
        let containment = Containment::new(window.clone(), ContainmentPolicy::default()).unwrap();
        containment.initialize().unwrap();
        containment.lock();
        containment.set_playing(false);
        let host = PlayerHost::mount(
            window.clone(),
            containment.clone(),
            StubWidget::new(&window, Duration::from_secs(300)),
            "abc12345678",
            HostConfig::desktop().with_autoplay(false),
            PlayerCallbacks::new(),
        )
        .unwrap();
        let gate = Arc::new(ParentGate::with_rng(
            Difficulty::Standard,
            WrongAnswerPolicy::Regenerate,
            StdRng::seed_from_u64(2),
        ));
        let controller =
            RecoveryController::install(containment.clone(), &host, gate, Arc::new(EscapeCounter::new()));
        assert_eq!(host.state(), PlayerState::Ready);

        containment.trigger_escape(&EscapeReason::EscapeKey);
        solve(controller.gate());

        assert_eq!(controller.last_outcome(), Some(RecoveryOutcome::Resumed));
        assert_eq!(host.state(), PlayerState::Ready);
        assert!(containment.is_locked() && !containment.is_playing());
    }

    #[test]
    fn test_gate_cancel_exits() {
        let f = fixture();
        let exited = Arc::new(AtomicUsize::new(0));
        let hits = exited.clone();
        f.controller.on_exit(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        f.containment.trigger_escape(&EscapeReason::HistoryPop);
        f.controller.gate().cancel();

        assert!(!f.host.is_mounted());
        assert!(!f.containment.is_locked());
        assert!(f.stub.commands().contains(&WidgetCommand::Destroy));
        assert_eq!(f.controller.last_outcome(), Some(RecoveryOutcome::Exited));
        assert_eq!(exited.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_escapes_share_one_prompt() {
        let f = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        f.controller
            .on_escape_attempt(move |reason, n| sink.lock().push((reason.clone(), n)));

        f.containment.trigger_escape(&EscapeReason::HistoryPop);
        let question = f.controller.gate().question();
        f.containment.trigger_escape(&EscapeReason::EscapeKey);

        assert_eq!(f.controller.counter().get(), 2);
        assert_eq!(f.controller.gate().question(), question);
        assert_eq!(
            *seen.lock(),
            vec![(EscapeReason::HistoryPop, 1), (EscapeReason::EscapeKey, 2)]
        );
    }

    #[test]
    fn test_pause_failure_is_not_fatal() {
        let f = fixture();
        f.stub.set_failing(true);
        let completed = f.containment.trigger_escape(&EscapeReason::FullscreenRequest);
        assert_eq!(completed, 1);
        assert_eq!(f.controller.counter().get(), 1);
        assert!(f.controller.gate().is_visible());
    }

    #[test]
    fn test_uninstall_stops_reacting() {
        let f = fixture();
        f.controller.uninstall();
        f.controller.uninstall();
        assert_eq!(f.containment.reaction_count(), 0);
        f.containment.trigger_escape(&EscapeReason::HistoryPop);
        assert_eq!(f.controller.counter().get(), 0);
        assert!(!f.controller.gate().is_visible());
    }
}
