//! Per-session escape attempt counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts escape attempts within one playback session.
///
/// Reporting only: nothing makes policy decisions from the value.
#[derive(Debug, Default)]
pub struct EscapeCounter {
    count: AtomicU64,
}

impl EscapeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt, returning the new total.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Start a new session.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments_and_resets() {
        let counter = EscapeCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
        counter.reset();
        assert_eq!(counter.get(), 0);
    }
}
