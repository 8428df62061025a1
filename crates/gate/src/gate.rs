//! The parent gate modal.
//!
//! Blocks until an adult answers the challenge. Callers either await
//! `show()` or hand a callback to `show_with()`; both resolve to `true` on
//! a correct answer and `false` on cancel.

use crate::challenge::{Challenge, Difficulty, WrongAnswerPolicy};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::oneshot;

pub const WRONG_ANSWER_MESSAGE: &str = "That's not right. Try again.";
pub const NOT_A_NUMBER_MESSAGE: &str = "Please enter a number.";

type Resolver = Box<dyn FnOnce(bool) + Send>;

/// Result of submitting an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Correct; the gate closed and resolved `true`.
    Accepted,
    /// Wrong or unparsable; the gate stays open with an error message.
    Rejected { message: String },
    /// The gate was not showing.
    NotShown,
}

struct Pending {
    challenge: Challenge,
    error: Option<String>,
    attempts: u32,
    resolvers: Vec<Resolver>,
}

/// Modal challenge that must be solved before a parent-only action.
pub struct ParentGate {
    difficulty: Difficulty,
    policy: WrongAnswerPolicy,
    rng: Mutex<StdRng>,
    pending: Mutex<Option<Pending>>,
}

impl ParentGate {
    pub fn new(difficulty: Difficulty, policy: WrongAnswerPolicy) -> Self {
        Self::with_rng(difficulty, policy, StdRng::from_entropy())
    }

    pub fn with_rng(difficulty: Difficulty, policy: WrongAnswerPolicy, rng: StdRng) -> Self {
        Self {
            difficulty,
            policy,
            rng: Mutex::new(rng),
            pending: Mutex::new(None),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_visible(&self) -> bool {
        self.pending.lock().is_some()
    }

    pub fn challenge(&self) -> Option<Challenge> {
        self.pending.lock().as_ref().map(|p| p.challenge)
    }

    pub fn question(&self) -> Option<String> {
        self.challenge().map(|c| c.question())
    }

    /// Error shown under the input after a wrong answer.
    pub fn error_message(&self) -> Option<String> {
        self.pending.lock().as_ref().and_then(|p| p.error.clone())
    }

    pub fn attempts(&self) -> u32 {
        self.pending.lock().as_ref().map_or(0, |p| p.attempts)
    }

    fn generate(&self) -> Challenge {
        Challenge::generate(&mut *self.rng.lock(), self.difficulty)
    }

    /// Show the gate and call `on_result` once it resolves. If the gate is
    /// already open the caller joins the pending prompt.
    pub fn show_with(&self, on_result: impl FnOnce(bool) + Send + 'static) {
        let mut pending = self.pending.lock();
        match pending.as_mut() {
            Some(open) => open.resolvers.push(Box::new(on_result)),
            None => {
                let challenge = self.generate();
                tracing::debug!("parent gate shown: {}", challenge);
                *pending = Some(Pending {
                    challenge,
                    error: None,
                    attempts: 0,
                    resolvers: vec![Box::new(on_result)],
                });
            }
        }
    }

    /// Show the gate and wait for the answer.
    pub fn show(&self) -> BoxFuture<'static, bool> {
        let (tx, rx) = oneshot::channel();
        self.show_with(move |ok| {
            let _ = tx.send(ok);
        });
        // A dropped gate counts as cancel.
        rx.map(|result| result.unwrap_or(false)).boxed()
    }

    pub fn submit(&self, input: &str) -> SubmitOutcome {
        let mut guard = self.pending.lock();
        let Some(pending) = guard.as_mut() else {
            return SubmitOutcome::NotShown;
        };
        pending.attempts += 1;

        let message = match pending.challenge.check(input) {
            Some(true) => {
                let resolved = guard.take();
                drop(guard);
                tracing::info!("parent gate passed");
                if let Some(resolved) = resolved {
                    resolve(resolved.resolvers, true);
                }
                return SubmitOutcome::Accepted;
            }
            Some(false) => WRONG_ANSWER_MESSAGE,
            None => NOT_A_NUMBER_MESSAGE,
        };

        tracing::debug!("parent gate answer rejected (attempt {})", pending.attempts);
        pending.error = Some(message.to_string());
        if self.policy == WrongAnswerPolicy::Regenerate {
            pending.challenge = self.generate();
        }
        SubmitOutcome::Rejected {
            message: message.to_string(),
        }
    }

    /// Close the gate without an answer. Returns false if it was not open.
    pub fn cancel(&self) -> bool {
        let Some(pending) = self.pending.lock().take() else {
            return false;
        };
        tracing::info!("parent gate cancelled");
        resolve(pending.resolvers, false);
        true
    }
}

impl Default for ParentGate {
    fn default() -> Self {
        Self::new(Difficulty::Standard, WrongAnswerPolicy::Regenerate)
    }
}

impl Drop for ParentGate {
    fn drop(&mut self) {
        // Pending resolvers fire false so awaiting callers are released.
        if let Some(pending) = self.pending.get_mut().take() {
            resolve(pending.resolvers, false);
        }
    }
}

impl std::fmt::Debug for ParentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentGate")
            .field("difficulty", &self.difficulty)
            .field("policy", &self.policy)
            .field("visible", &self.is_visible())
            .finish()
    }
}

fn resolve(resolvers: Vec<Resolver>, ok: bool) {
    for resolver in resolvers {
        if panic::catch_unwind(AssertUnwindSafe(move || resolver(ok))).is_err() {
            tracing::error!("parent gate callback panicked");
        }
    }
}
