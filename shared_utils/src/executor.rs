//! Executor Module
//!
//! The batch pipeline only needs "map a unit of work over a list of inputs
//! and gather per-item results". [`Executor`] is that capability; the rayon
//! pool and a sequential fallback both satisfy it.
//!
//! Results come back in input order, so the caller can reduce them once,
//! single-threaded, after the pool drains.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait Executor {
    /// Number of items that may be in flight at once.
    fn workers(&self) -> usize;

    /// Applies `work` to every item and returns the results in input order.
    fn map<T, R, F>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync;
}

/// Fixed-size rayon thread pool.
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl RayonExecutor {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("convert-worker-{}", i))
            .build()
            .context("Failed to create thread pool")?;
        Ok(Self { pool, workers })
    }
}

impl Executor for RayonExecutor {
    fn workers(&self) -> usize {
        self.workers
    }

    fn map<T, R, F>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool
            .install(|| items.into_par_iter().map(|item| work(item)).collect())
    }
}

/// Runs every item on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn workers(&self) -> usize {
        1
    }

    fn map<T, R, F>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        items.into_iter().map(work).collect()
    }
}

/// Shared stop request. Work items check it before starting; items already
/// running are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
