use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe operation counters for the hierarchical queue.
///
/// Relaxed atomics: cheap to bump from the hot paths, read as a point-in-time
/// snapshot that may trail in-flight operations.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    pushes: AtomicU64,
    pops: AtomicU64,
    spills: AtomicU64,
    steals: AtomicU64,
    stolen_items: AtomicU64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_pop(&self) {
        self.pops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_spill(&self) {
        self.spills.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_steal(&self, items: u64) {
        self.steals.fetch_add(1, Ordering::Relaxed);
        self.stolen_items.fetch_add(items, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pushes: self.pushes.load(Ordering::Relaxed),
            pops: self.pops.load(Ordering::Relaxed),
            spills: self.spills.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            stolen_items: self.stolen_items.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Elements pushed through any handle.
    pub pushes: u64,
    /// Elements returned by any pop.
    pub pops: u64,
    /// Threshold drains from a local heap into the global heap.
    pub spills: u64,
    /// Successful steals (at least one element moved).
    pub steals: u64,
    /// Total elements moved by steals.
    pub stolen_items: u64,
}
