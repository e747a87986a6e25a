use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace, warn, Span};

use super::config::PoolConfig;
use super::metrics::PoolMetrics;
use super::policy::{PoolSnapshot, PoolState, ScalingPolicy};
use crate::fault::PoolError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct WorkItem {
    job: Job,
    span: Span,
    submitted_at: Instant,
}

enum Next {
    Run(WorkItem),
    Retire,
    Stop,
}

struct Shared {
    queue: Mutex<VecDeque<WorkItem>>,
    available: Condvar,
    // Coarse resize lock; index is the worker's slot.
    slots: Mutex<Vec<Option<JoinHandle<()>>>>,
    size: AtomicUsize,
    busy: AtomicUsize,
    queued: AtomicUsize,
    disposed: AtomicBool,
    policy: ScalingPolicy,
    config: PoolConfig,
    metrics: PoolMetrics,
}

/// Elastic thread pool draining one shared FIFO queue.
///
/// See the [module documentation](super) for sizing rules.
pub struct AdaptiveWorkerPool {
    shared: Arc<Shared>,
}

impl AdaptiveWorkerPool {
    /// Create a pool and start its minimum complement of workers.
    pub fn new(config: PoolConfig) -> Self {
        let config = config.normalized();
        let policy = ScalingPolicy::new(&config);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            slots: Mutex::new((0..config.max_workers).map(|_| None).collect()),
            size: AtomicUsize::new(0),
            busy: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            policy,
            config,
            metrics: PoolMetrics::new(),
        });

        {
            let mut slots = shared.slots.lock();
            for slot in 0..config.min_workers {
                if !Shared::spawn_worker(&shared, &mut slots, slot) {
                    break;
                }
            }
        }

        info!(
            min_workers = config.min_workers,
            max_workers = config.max_workers,
            grow_increment = config.grow_increment,
            idle_timeout_ms = config.idle_timeout.as_millis() as u64,
            "Worker pool started"
        );

        Self { shared }
    }

    /// Queue `job` for execution on a worker thread.
    ///
    /// Never blocks on the job itself. The caller's current `tracing` span is
    /// re-entered on the worker while the job runs.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.disposed.load(Ordering::Acquire) {
            return Err(PoolError::Disposed);
        }

        {
            let mut queue = self.shared.queue.lock();
            queue.push_back(WorkItem {
                job: Box::new(job),
                span: Span::current(),
                submitted_at: Instant::now(),
            });
            self.shared.queued.store(queue.len(), Ordering::Release);
        }
        self.shared.metrics.record_submit();
        self.shared.available.notify_one();
        Shared::ensure_capacity(&self.shared);
        Ok(())
    }

    /// Stop accepting work, let running items finish, then join the workers.
    ///
    /// Items still queued are dropped. Calling this more than once is a no-op.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.available.notify_all();

        let handles: Vec<JoinHandle<()>> = {
            let mut slots = self.shared.slots.lock();
            slots.iter_mut().filter_map(Option::take).collect()
        };
        let dropped = {
            let mut queue = self.shared.queue.lock();
            let dropped = queue.len();
            queue.clear();
            self.shared.queued.store(0, Ordering::Release);
            dropped
        };

        let current = thread::current().id();
        for handle in handles {
            // A worker disposing its own pool cannot join itself.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("Worker thread terminated abnormally during dispose");
            }
        }
        info!(dropped_items = dropped, "Worker pool disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    pub fn size(&self) -> usize {
        self.shared.size.load(Ordering::Acquire)
    }

    pub fn busy(&self) -> usize {
        self.shared.busy.load(Ordering::Acquire)
    }

    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.shared.snapshot()
    }

    pub fn state(&self) -> PoolState {
        self.shared.policy.classify(self.shared.snapshot())
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.shared.metrics
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

impl Drop for AdaptiveWorkerPool {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for AdaptiveWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveWorkerPool")
            .field("config", &self.shared.config)
            .field("snapshot", &self.shared.snapshot())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Shared {
    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            size: self.size.load(Ordering::Acquire),
            busy: self.busy.load(Ordering::Acquire),
            queued: self.queued.load(Ordering::Acquire),
        }
    }

    fn ensure_capacity(shared: &Arc<Shared>) {
        if shared.policy.growth(shared.snapshot()) == 0 {
            return;
        }

        let mut slots = shared.slots.lock();
        if shared.disposed.load(Ordering::Acquire) {
            return;
        }
        // Another submitter may have grown the pool while we waited.
        let snapshot = shared.snapshot();
        let wanted = shared.policy.growth(snapshot);
        if wanted == 0 {
            return;
        }

        let mut added = 0;
        for slot in 0..slots.len() {
            if added == wanted {
                break;
            }
            if slots[slot].is_some() {
                continue;
            }
            if !Shared::spawn_worker(shared, &mut slots, slot) {
                break;
            }
            added += 1;
        }

        if added > 0 {
            shared.metrics.record_grow();
            info!(
                added,
                size = snapshot.size + added,
                busy = snapshot.busy,
                queued = snapshot.queued,
                "Worker pool grew"
            );
        }
    }

    /// Start a worker in `slot`. Caller holds the slot lock.
    fn spawn_worker(
        shared: &Arc<Shared>,
        slots: &mut [Option<JoinHandle<()>>],
        slot: usize,
    ) -> bool {
        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("resthost-worker-{slot}"))
            .spawn(move || worker_loop(worker_shared, slot));

        match spawned {
            Ok(handle) => {
                slots[slot] = Some(handle);
                shared.size.fetch_add(1, Ordering::AcqRel);
                shared.metrics.record_spawn();
                true
            }
            Err(e) => {
                error!(slot, error = %e, "Failed to spawn worker thread");
                false
            }
        }
    }

    fn next_item(&self, slot: usize, idle_since: Instant) -> Next {
        let mut queue = self.queue.lock();
        loop {
            if self.disposed.load(Ordering::Acquire) {
                return Next::Stop;
            }
            if let Some(item) = queue.pop_front() {
                self.queued.store(queue.len(), Ordering::Release);
                return Next::Run(item);
            }
            if self
                .available
                .wait_for(&mut queue, self.config.wait_interval)
                .timed_out()
                && queue.is_empty()
                && self.policy.should_retire(slot, idle_since.elapsed())
            {
                return Next::Retire;
            }
        }
    }

    /// Release `slot` unless work arrived in the meantime.
    fn try_retire(&self, slot: usize) -> bool {
        let mut slots = self.slots.lock();
        if self.queued.load(Ordering::Acquire) > 0 || self.disposed.load(Ordering::Acquire) {
            return false;
        }
        // Dropping our own handle detaches the thread.
        slots[slot] = None;
        self.size.fetch_sub(1, Ordering::AcqRel);
        self.metrics.record_retire();
        true
    }

    fn run(&self, item: WorkItem) {
        self.busy.fetch_add(1, Ordering::AcqRel);
        let WorkItem {
            job,
            span,
            submitted_at,
        } = item;
        let panicked = {
            let _entered = span.enter();
            trace!(
                queue_wait_us = submitted_at.elapsed().as_micros() as u64,
                "Work item dequeued"
            );
            match catch_unwind(AssertUnwindSafe(job)) {
                Ok(()) => false,
                Err(payload) => {
                    let message = crate::dispatcher::panic_message(payload.as_ref());
                    error!(panic = %message, "Work item panicked - worker continues");
                    true
                }
            }
        };
        self.busy.fetch_sub(1, Ordering::AcqRel);
        self.metrics.record_completion(panicked);
    }
}

fn worker_loop(shared: Arc<Shared>, slot: usize) {
    let mut idle_since = Instant::now();
    loop {
        match shared.next_item(slot, idle_since) {
            Next::Run(item) => {
                shared.run(item);
                idle_since = Instant::now();
            }
            Next::Retire => {
                if shared.try_retire(slot) {
                    debug!(slot, "Idle worker retired");
                    return;
                }
                idle_since = Instant::now();
            }
            Next::Stop => {
                shared.size.fetch_sub(1, Ordering::AcqRel);
                return;
            }
        }
    }
}

static GLOBAL_POOL: Lazy<Arc<AdaptiveWorkerPool>> =
    Lazy::new(|| Arc::new(AdaptiveWorkerPool::new(PoolConfig::from_env())));

/// The process-wide pool, created from the environment on first use.
pub fn global() -> Arc<AdaptiveWorkerPool> {
    Arc::clone(&GLOBAL_POOL)
}
