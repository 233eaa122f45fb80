//! Data-parallel worker pool for the meshing and bake passes.
//!
//! Every call blocks until the whole pass has finished, so results are
//! always complete when the caller reads them.

use rayon::prelude::*;

/// Default number of items per parallel grain.
pub const DEFAULT_GRAIN: usize = 128;

/// Errors that can occur while building the worker pool.
#[derive(Debug, thiserror::Error)]
#[error("failed to build worker pool: {0}")]
pub struct PoolError(#[from] rayon::ThreadPoolBuildError);

/// A dedicated `rayon` pool with a fixed grain size.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    grain: usize,
}

impl WorkerPool {
    /// Builds a pool. `threads == 0` picks `num_cpus - 1` (at least one).
    pub fn new(threads: usize, grain: usize) -> Result<Self, PoolError> {
        let threads = if threads == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("quarry-worker-{i}"))
            .build()?;
        tracing::info!("Worker pool started with {threads} threads (grain {grain})");
        Ok(Self {
            pool,
            grain: grain.max(1),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn grain(&self) -> usize {
        self.grain
    }

    /// Calls `f(first_index, chunk)` for every grain-sized chunk of `out`.
    pub fn for_each_chunk_mut<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        let grain = self.grain;
        self.pool.install(|| {
            out.par_chunks_mut(grain)
                .enumerate()
                .for_each(|(i, chunk)| f(i * grain, chunk));
        });
    }

    /// Calls `f` on every item, one unit of work per item.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        self.pool.install(|| items.par_iter_mut().for_each(f));
    }

    /// Maps every item in parallel, preserving order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}
