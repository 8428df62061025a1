//! Parent gate and escape recovery.

pub mod challenge;
pub mod gate;
pub mod recovery;

pub use challenge::{Challenge, Difficulty, Operator, WrongAnswerPolicy};
pub use gate::{ParentGate, SubmitOutcome, NOT_A_NUMBER_MESSAGE, WRONG_ANSWER_MESSAGE};
pub use recovery::{EscapeCallback, RecoveryCallback, RecoveryController, RecoveryOutcome};
