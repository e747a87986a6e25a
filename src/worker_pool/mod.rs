//! # Adaptive Worker Pool
//!
//! A process-wide pool of OS threads that executes queued work items and
//! resizes itself with load.
//!
//! ## Overview
//!
//! Work items are boxed closures queued FIFO behind a mutex and a condition
//! variable. Each item also carries the `tracing` span that was current
//! when it was submitted, so logs emitted by the work stay correlated with
//! the request that queued it.
//!
//! ## Sizing
//!
//! | Bound | Value |
//! |---|---|
//! | minimum | available cores, doubled on one- and two-core machines |
//! | maximum | cores × `RESTHOST_MAX_THREADS_PER_CPU` (default 8), never below the minimum |
//! | growth step | one core's worth of threads, capped at the maximum |
//!
//! Growth is checked on every submission: when queued items outnumber idle
//! workers and the pool is below its maximum, it grows by the growth step.
//! Resizing happens under one coarse lock so concurrent submissions never
//! grow the pool twice for the same backlog. A worker whose slot lies above
//! the minimum retires after sitting idle for `RESTHOST_POOL_IDLE_MS`
//! (default 30s). Slots are filled lowest-first, so the pool never shrinks
//! below its minimum.
//!
//! The sizing rules are expressed by [`ScalingPolicy`] over a
//! [`PoolSnapshot`], which is what the unit tests exercise.
//!
//! ## Failure handling
//!
//! A panic inside a work item is caught and logged; the worker keeps
//! running. [`AdaptiveWorkerPool::dispose`] stops workers from taking new
//! items, lets in-flight items finish and joins the threads.
//!
//! ## Example
//!
//! ```rust
//! use resthost::worker_pool::{AdaptiveWorkerPool, PoolConfig};
//! use std::sync::mpsc;
//!
//! let pool = AdaptiveWorkerPool::new(PoolConfig::default());
//! let (tx, rx) = mpsc::channel();
//! pool.submit(move || tx.send(21 * 2).unwrap()).unwrap();
//! assert_eq!(rx.recv().unwrap(), 42);
//! pool.dispose();
//! ```

mod config;
mod metrics;
mod policy;
mod pool;

pub use config::{PoolConfig, MIN_WORKER_FLOOR};
pub use metrics::PoolMetrics;
pub use policy::{PoolSnapshot, PoolState, ScalingPolicy};
pub use pool::{global, AdaptiveWorkerPool};
