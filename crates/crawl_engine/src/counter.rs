use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared crawl counters. One instance is owned by the engine and handed to
/// every stage.
#[derive(Debug, Default)]
pub struct TaskCounter {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    produced: AtomicU64,
}

impl TaskCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_total(&self) {
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_produced(&self) {
        self.produced.fetch_add(1, Ordering::SeqCst);
    }

    pub fn summary(&self) -> Summary {
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        Summary {
            total: self.total.load(Ordering::SeqCst),
            completed: succeeded + failed,
            succeeded,
            failed,
            produced: self.produced.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time snapshot of a [`TaskCounter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: u64,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub produced: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} completed={} succeeded={} failed={} produced={}",
            self.total, self.completed, self.succeeded, self.failed, self.produced
        )
    }
}
