use std::time::Duration;

use super::config::PoolConfig;

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolSnapshot {
    /// Live workers.
    pub size: usize,
    /// Workers currently running an item.
    pub busy: usize,
    /// Items waiting in the queue.
    pub queued: usize,
}

impl PoolSnapshot {
    pub fn idle(&self) -> usize {
        self.size.saturating_sub(self.busy)
    }
}

/// Coarse pool state derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Nothing queued, nothing running.
    Idle,
    /// Work is queued or running and current workers can absorb it.
    Draining,
    /// The backlog exceeds idle workers and there is room to grow.
    Growing,
    /// Surplus workers are idle and will retire once their timeout lapses.
    Shrinking,
}

/// Sizing rules for the adaptive pool.
#[derive(Debug, Clone, Copy)]
pub struct ScalingPolicy {
    min: usize,
    max: usize,
    increment: usize,
    idle_timeout: Duration,
}

impl ScalingPolicy {
    pub fn new(config: &PoolConfig) -> Self {
        let config = config.normalized();
        Self {
            min: config.min_workers,
            max: config.max_workers,
            increment: config.grow_increment,
            idle_timeout: config.idle_timeout,
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Workers to add for `snapshot`; zero when no growth is warranted.
    pub fn growth(&self, snapshot: PoolSnapshot) -> usize {
        if snapshot.queued > snapshot.idle() && snapshot.size < self.max {
            self.increment.min(self.max - snapshot.size)
        } else {
            0
        }
    }

    /// Whether the worker in `slot` should retire after idling for `idle_for`.
    pub fn should_retire(&self, slot: usize, idle_for: Duration) -> bool {
        slot >= self.min && idle_for >= self.idle_timeout
    }

    pub fn classify(&self, snapshot: PoolSnapshot) -> PoolState {
        if self.growth(snapshot) > 0 {
            PoolState::Growing
        } else if snapshot.queued > 0 || snapshot.busy > 0 {
            PoolState::Draining
        } else if snapshot.size > self.min {
            PoolState::Shrinking
        } else {
            PoolState::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ScalingPolicy {
        ScalingPolicy::new(&PoolConfig {
            min_workers: 4,
            max_workers: 10,
            grow_increment: 4,
            idle_timeout: Duration::from_secs(30),
            wait_interval: Duration::from_secs(1),
        })
    }

    fn snapshot(size: usize, busy: usize, queued: usize) -> PoolSnapshot {
        PoolSnapshot { size, busy, queued }
    }

    #[test]
    fn grows_when_backlog_exceeds_idle_workers() {
        let policy = policy();
        assert_eq!(policy.growth(snapshot(4, 4, 1)), 4);
        assert_eq!(policy.growth(snapshot(4, 2, 2)), 0);
        assert_eq!(policy.growth(snapshot(4, 2, 3)), 4);
    }

    #[test]
    fn growth_is_capped_at_max() {
        let policy = policy();
        assert_eq!(policy.growth(snapshot(8, 8, 5)), 2);
        assert_eq!(policy.growth(snapshot(10, 10, 50)), 0);
    }

    #[test]
    fn only_surplus_slots_retire() {
        let policy = policy();
        let long = Duration::from_secs(31);
        assert!(!policy.should_retire(3, long));
        assert!(policy.should_retire(4, long));
        assert!(!policy.should_retire(4, Duration::from_secs(5)));
    }

    #[test]
    fn classification() {
        let policy = policy();
        assert_eq!(policy.classify(snapshot(4, 0, 0)), PoolState::Idle);
        assert_eq!(policy.classify(snapshot(4, 1, 0)), PoolState::Draining);
        assert_eq!(policy.classify(snapshot(4, 4, 2)), PoolState::Growing);
        assert_eq!(policy.classify(snapshot(8, 0, 0)), PoolState::Shrinking);
        assert_eq!(policy.classify(snapshot(10, 10, 3)), PoolState::Draining);
    }
}
