//! Arithmetic challenges.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How hard the challenge is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Two-operand addition. Used to lift containment.
    #[default]
    Standard,
    /// Two-digit by one-digit multiplication. Used before destructive actions.
    Elevated,
}

/// What happens to the problem after a wrong answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrongAnswerPolicy {
    /// Replace the problem with a fresh one.
    #[default]
    Regenerate,
    /// Keep the same problem on screen.
    Keep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Multiply,
}

impl Operator {
    fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Multiply => '×',
        }
    }
}

/// One generated problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Challenge {
    left: i64,
    right: i64,
    operator: Operator,
}

impl Challenge {
    pub fn new(left: i64, right: i64, operator: Operator) -> Self {
        Self {
            left,
            right,
            operator,
        }
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Standard => {
                Self::new(rng.gen_range(3..=19), rng.gen_range(3..=19), Operator::Add)
            }
            Difficulty::Elevated => {
                Self::new(rng.gen_range(12..=99), rng.gen_range(3..=9), Operator::Multiply)
            }
        }
    }

    pub fn operands(&self) -> (i64, i64) {
        (self.left, self.right)
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn answer(&self) -> i64 {
        match self.operator {
            Operator::Add => self.left + self.right,
            Operator::Multiply => self.left * self.right,
        }
    }

    /// The prompt shown to the parent.
    pub fn question(&self) -> String {
        format!("What is {}?", self)
    }

    /// Compare parsed integer input. Surrounding whitespace is ignored;
    /// anything that is not an integer is `None`.
    pub fn check(&self, input: &str) -> Option<bool> {
        input
            .trim()
            .parse::<i64>()
            .ok()
            .map(|value| value == self.answer())
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator.symbol(), self.right)
    }
}
