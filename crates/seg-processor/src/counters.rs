//! Run-scoped progress counters
//!
//! Every field is only ever advanced with `fetch_add`; readers take a
//! [`CounterSnapshot`] instead of touching the atomics directly.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    read: AtomicU64,
    enqueued: AtomicU64,
    inserted: AtomicU64,
    updated: AtomicU64,
    duplicates: AtomicU64,
    failed: AtomicU64,
    invalid: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    ///
    /// Fields are loaded one by one, so a snapshot taken mid-run may straddle an
    /// in-flight row. Snapshots taken after the workers have joined are exact.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            read: self.read.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub read: u64,
    pub enqueued: u64,
    pub inserted: u64,
    pub updated: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub invalid: u64,
}

impl CounterSnapshot {
    /// Records that reached the store successfully
    pub fn completed(&self) -> u64 {
        self.inserted + self.updated + self.duplicates
    }

    /// Records a worker took to the store, successfully or not
    pub fn consumed(&self) -> u64 {
        self.completed() + self.failed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_reflects_increments() {
        let counters = Counters::new();
        counters.record_read();
        counters.record_read();
        counters.record_invalid();
        counters.record_enqueued();
        counters.record_updated();

        let snap = counters.snapshot();
        assert_eq!(snap.read, 2);
        assert_eq!(snap.invalid, 1);
        assert_eq!(snap.enqueued, 1);
        assert_eq!(snap.updated, 1);
        assert_eq!(snap.completed(), 1);
        assert_eq!(snap.consumed(), 1);
    }

    #[test]
    fn test_failed_is_consumed_but_not_completed() {
        let counters = Counters::new();
        counters.record_failed();
        counters.record_duplicate();

        let snap = counters.snapshot();
        assert_eq!(snap.completed(), 1);
        assert_eq!(snap.consumed(), 2);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counters = Arc::new(Counters::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counters.record_inserted();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.snapshot().inserted, 8000);
    }
}
