//! Generation tokens for cooperative cancellation
//!
//! Every async continuation (unit finished, capture ended, timer fired)
//! captures an [`EpochToken`] when it is scheduled and checks it before
//! acting. Advancing the [`Epoch`] turns every outstanding token stale, so a
//! late callback from a superseded run is a guaranteed no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing counter shared with the tokens it hands out
#[derive(Debug, Clone, Default)]
pub struct Epoch {
    current: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all outstanding tokens and return a fresh one
    pub fn advance(&self) -> EpochToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        EpochToken {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    /// Invalidate all outstanding tokens
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// Current generation number
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Snapshot of an [`Epoch`] taken when a continuation was scheduled
#[derive(Debug, Clone)]
pub struct EpochToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl EpochToken {
    /// True while no newer generation has been started
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_previous() {
        let epoch = Epoch::new();
        let first = epoch.advance();
        assert!(first.is_current());

        let second = epoch.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_invalidate() {
        let epoch = Epoch::new();
        let token = epoch.advance();
        epoch.invalidate();
        assert!(!token.is_current());
    }
}
