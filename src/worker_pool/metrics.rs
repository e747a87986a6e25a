use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters of a worker pool.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    submitted_count: AtomicU64,
    completed_count: AtomicU64,
    panicked_count: AtomicU64,
    spawned_count: AtomicU64,
    grow_count: AtomicU64,
    retired_count: AtomicU64,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submit(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished item; `panicked` marks items that unwound.
    pub fn record_completion(&self, panicked: bool) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.panicked_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_spawn(&self) {
        self.spawned_count.fetch_add(1, Ordering::Relaxed);
    }

    /// One growth step, however many workers it added.
    pub fn record_grow(&self) {
        self.grow_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retire(&self) {
        self.retired_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn get_panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }

    pub fn get_spawned_count(&self) -> u64 {
        self.spawned_count.load(Ordering::Relaxed)
    }

    pub fn get_grow_count(&self) -> u64 {
        self.grow_count.load(Ordering::Relaxed)
    }

    pub fn get_retired_count(&self) -> u64 {
        self.retired_count.load(Ordering::Relaxed)
    }
}
