use std::num::NonZeroUsize;
use std::time::Duration;

use crate::runtime_config::RuntimeConfig;

/// Below this many cores the minimum worker count is doubled.
pub const MIN_WORKER_FLOOR: usize = 4;

/// How often an idle worker wakes to check for retirement.
const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Sizing of an [`AdaptiveWorkerPool`](super::AdaptiveWorkerPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Workers started up front and never retired.
    pub min_workers: usize,
    /// Hard ceiling on concurrent workers.
    pub max_workers: usize,
    /// Workers added per growth step.
    pub grow_increment: usize,
    /// Idle period after which a worker above the minimum retires.
    pub idle_timeout: Duration,
    /// Condition-variable wait between idle checks.
    pub wait_interval: Duration,
}

impl PoolConfig {
    /// Derive bounds from the machine's parallelism and `runtime`.
    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::for_cores(cores, runtime.max_threads_per_cpu, runtime.pool_idle_timeout)
    }

    /// Load from the `RESTHOST_*` environment.
    pub fn from_env() -> Self {
        Self::from_runtime(&RuntimeConfig::from_env())
    }

    pub fn for_cores(cores: usize, max_threads_per_cpu: usize, idle_timeout: Duration) -> Self {
        let cores = cores.max(1);
        let min_workers = if cores < MIN_WORKER_FLOOR {
            cores * 2
        } else {
            cores
        };
        let max_workers = (cores * max_threads_per_cpu.max(1)).max(min_workers);
        Self {
            min_workers,
            max_workers,
            grow_increment: cores,
            idle_timeout,
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }

    /// Clamp fields into a consistent shape.
    pub fn normalized(mut self) -> Self {
        self.min_workers = self.min_workers.max(1);
        self.max_workers = self.max_workers.max(self.min_workers);
        self.grow_increment = self.grow_increment.max(1);
        if self.wait_interval.is_zero() {
            self.wait_interval = Duration::from_millis(1);
        }
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_runtime(&RuntimeConfig::default())
    }
}
