//! Containment state and actions.
//!
//! One `Containment` is owned by the playback view for the life of the app.
//! It tracks two independent axes (`locked`, `playing`), owns every
//! subscription the detector installs, and fans escape attempts out to the
//! registered reactions.

use crate::classify::{Classifier, SignalContext};
use crate::detector;
use crate::origin::Origin;
use crate::policy::{ContainmentPolicy, SENTINEL_ENTRIES};
use crate::signal::{EscapeClassification, EscapeReason, EscapeSignal};
use crate::subscription::Subscription;
use common::SafeViewResult;
use derive_more::Display;
use dom::Window;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Reaction to an escape attempt. Errors are logged, never propagated.
pub type ReactionCallback = Arc<dyn Fn(&EscapeReason) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registered reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("reaction#{_0}")]
pub struct ReactionId(u64);

/// Returned by `register_reaction`; removes exactly that reaction.
#[derive(Debug)]
pub struct ReactionHandle {
    id: ReactionId,
    containment: Weak<Containment>,
}

impl ReactionHandle {
    pub fn id(&self) -> ReactionId {
        self.id
    }

    /// Returns false if the reaction was already gone (for example after teardown).
    pub fn unsubscribe(self) -> bool {
        match self.containment.upgrade() {
            Some(containment) => containment.reactions.write().shift_remove(&self.id).is_some(),
            None => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ContainmentState {
    initialized: bool,
    locked: bool,
    playing: bool,
}

/// Point-in-time view of the containment state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainmentSnapshot {
    pub initialized: bool,
    pub locked: bool,
    pub playing: bool,
    pub handles: usize,
    pub reactions: usize,
}

/// The containment context.
pub struct Containment {
    window: Arc<Window>,
    classifier: Classifier,
    state: RwLock<ContainmentState>,
    handles: Mutex<Vec<Subscription>>,
    reactions: RwLock<IndexMap<ReactionId, ReactionCallback>>,
    next_reaction: AtomicU64,
    classified: AtomicU64,
    this: Weak<Containment>,
}

impl Containment {
    pub fn new(window: Arc<Window>, policy: ContainmentPolicy) -> SafeViewResult<Arc<Self>> {
        policy.validate()?;
        let app_origin = Origin::from_url(window.document().url());
        let classifier = Classifier::new(Arc::new(policy), app_origin);

        Ok(Arc::new_cyclic(|this| Self {
            window,
            classifier,
            state: RwLock::new(ContainmentState::default()),
            handles: Mutex::new(Vec::new()),
            reactions: RwLock::new(IndexMap::new()),
            next_reaction: AtomicU64::new(1),
            classified: AtomicU64::new(0),
            this: this.clone(),
        }))
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn policy(&self) -> &ContainmentPolicy {
        self.classifier.policy()
    }

    // Lifecycle

    /// Install every detector subscription. A second call while initialized
    /// is a no-op and returns `Ok(false)`.
    pub fn initialize(&self) -> SafeViewResult<bool> {
        let mut handles = self.handles.lock();
        if self.state.read().initialized {
            tracing::warn!("containment already initialized; ignoring");
            return Ok(false);
        }

        let installed = detector::install(&self.window, self.this.clone(), self.policy())?;
        tracing::debug!("containment installed {} subscriptions", installed.len());
        *handles = installed;
        self.state.write().initialized = true;
        Ok(true)
    }

    /// Release every subscription, clear reactions and reset state.
    ///
    /// A disposer that panics is logged and the rest still run.
    pub fn teardown(&self) {
        let handles = {
            let mut handles = self.handles.lock();
            if !self.state.read().initialized {
                tracing::warn!("containment teardown while not initialized");
                return;
            }
            std::mem::take(&mut *handles)
        };

        for mut handle in handles {
            let label = handle.label();
            if panic::catch_unwind(AssertUnwindSafe(|| handle.dispose())).is_err() {
                tracing::error!("cleanup for {} panicked", label);
            }
        }

        self.reactions.write().clear();
        *self.state.write() = ContainmentState::default();
        tracing::debug!("containment torn down");
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    // Lock and playing axes

    /// Start containing. Pushes sentinel history entries so a rapid
    /// double-back lands on one of them.
    pub fn lock(&self) {
        {
            let mut state = self.state.write();
            state.locked = true;
            state.playing = true;
        }
        for _ in 0..SENTINEL_ENTRIES {
            self.window.push_state(Some(sentinel_state()));
        }
        tracing::debug!("containment locked");
    }

    pub fn unlock(&self) {
        let mut state = self.state.write();
        state.locked = false;
        state.playing = false;
        tracing::debug!("containment unlocked");
    }

    pub fn set_playing(&self, playing: bool) {
        self.state.write().playing = playing;
    }

    pub fn is_locked(&self) -> bool {
        self.state.read().locked
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().playing
    }

    pub fn context(&self) -> SignalContext {
        let state = self.state.read();
        SignalContext {
            locked: state.locked,
            playing: state.playing,
        }
    }

    pub fn snapshot(&self) -> ContainmentSnapshot {
        let state = *self.state.read();
        ContainmentSnapshot {
            initialized: state.initialized,
            locked: state.locked,
            playing: state.playing,
            handles: self.handles.lock().len(),
            reactions: self.reactions.read().len(),
        }
    }

    /// Absorb one back navigation.
    pub(crate) fn push_sentinel(&self) {
        self.window.push_state(Some(sentinel_state()));
    }

    // Signals and reactions

    /// Classify a signal against the current state, escalating escape attempts.
    pub fn handle_signal(&self, signal: EscapeSignal) -> EscapeClassification {
        let verdict = self.classifier.classify(&signal, self.context());
        self.classified.fetch_add(1, Ordering::Relaxed);

        match &verdict {
            EscapeClassification::EscapeAttempt(reason) => {
                tracing::info!("escape attempt: {}", reason);
                self.trigger_escape(reason);
            }
            EscapeClassification::Benign(reason) => {
                tracing::debug!("benign signal: {}", reason);
            }
        }
        verdict
    }

    /// Number of signals classified since creation.
    pub fn classified_count(&self) -> u64 {
        self.classified.load(Ordering::Relaxed)
    }

    pub fn register_reaction(&self, callback: ReactionCallback) -> ReactionHandle {
        let id = ReactionId(self.next_reaction.fetch_add(1, Ordering::SeqCst));
        self.reactions.write().insert(id, callback);
        ReactionHandle {
            id,
            containment: self.this.clone(),
        }
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.read().len()
    }

    /// Run every reaction in registration order. Returns how many completed
    /// without error.
    pub fn trigger_escape(&self, reason: &EscapeReason) -> usize {
        let reactions: Vec<(ReactionId, ReactionCallback)> = self
            .reactions
            .read()
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();

        let mut completed = 0;
        for (id, reaction) in reactions {
            match panic::catch_unwind(AssertUnwindSafe(|| reaction(reason))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(err)) => tracing::error!("{} failed: {:#}", id, err),
                Err(_) => tracing::error!("{} panicked", id),
            }
        }
        completed
    }

    #[cfg(test)]
    pub(crate) fn push_handle(&self, handle: Subscription) {
        self.handles.lock().push(handle);
    }
}

impl std::fmt::Debug for Containment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Containment")
            .field("state", &*self.state.read())
            .field("handles", &self.handles.lock().len())
            .field("reactions", &self.reactions.read().len())
            .finish()
    }
}

fn sentinel_state() -> serde_json::Value {
    serde_json::json!({ "safeviewSentinel": true })
}
