//! Job execution strategies.
//!
//! A stage hands the executor N independent jobs and gets control back once
//! all of them have finished. Jobs never observe each other, so the
//! strategy only affects wall-clock time, never results.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::{Error, Result};

/// Run a batch of independent jobs, then barrier.
pub trait Executor {
    /// Run `f(0..count)` and collect the results in job order.
    fn map_jobs<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Run `f(i, &mut items[i])` for every item. Each job has exclusive
    /// access to its own item.
    fn for_each_job<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send;
}

/// Runs every job on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn map_jobs<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        (0..count).map(f).collect()
    }

    fn for_each_job<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        for (i, item) in items.iter_mut().enumerate() {
            f(i, item);
        }
    }
}

/// Runs jobs on rayon workers, either the global pool or a dedicated one.
pub struct RayonPool {
    pool: Option<ThreadPool>,
}

impl RayonPool {
    /// Use rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Build a dedicated pool with `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("cantor-worker-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    /// Worker count jobs will be spread over.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl std::fmt::Debug for RayonPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonPool")
            .field("dedicated", &self.pool.is_some())
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

impl Executor for RayonPool {
    fn map_jobs<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.install(|| (0..count).into_par_iter().map(f).collect())
    }

    fn for_each_job<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        self.install(|| {
            items
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, item)| f(i, item))
        })
    }
}

/// The execution strategy owned by a [`Device`](super::Device).
#[derive(Debug)]
pub enum Backend {
    Sequential(Sequential),
    Rayon(RayonPool),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sequential(_) => "sequential",
            Backend::Rayon(_) => "rayon",
        }
    }
}

impl Executor for Backend {
    fn map_jobs<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            Backend::Sequential(exec) => exec.map_jobs(count, f),
            Backend::Rayon(exec) => exec.map_jobs(count, f),
        }
    }

    fn for_each_job<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync + Send,
    {
        match self {
            Backend::Sequential(exec) => exec.for_each_job(items, f),
            Backend::Rayon(exec) => exec.for_each_job(items, f),
        }
    }
}
