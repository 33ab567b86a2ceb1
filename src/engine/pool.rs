// src/engine/pool.rs
//
// Worker pool management for batch mutation runs.
//
// Thread count:
// - Uses std::thread::available_parallelism() to respect cgroup/CPU quota
// - Leaves one processing unit free for the caller
// - Never drops below MIN_WORKER_THREADS
//
// The default pool is global and initialized lazily on first use; changes to
// the environment after initialization have no effect. An explicit thread
// count builds a dedicated pool for that run instead.

use crate::error::{Result, SpliceError};
use rayon::ThreadPool;
use std::sync::{Arc, OnceLock};

/// Minimum number of worker threads
pub const MIN_WORKER_THREADS: usize = 1;

/// Upper bound accepted for an explicit thread count
pub const MAX_WORKER_THREADS: usize = 1024;

static GLOBAL_THREAD_POOL: OnceLock<Arc<ThreadPool>> = OnceLock::new();

/// Default worker count: available parallelism minus one, at least one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKER_THREADS)
        .saturating_sub(1)
        .max(MIN_WORKER_THREADS)
}

/// Pool for a run: the shared global pool, or a dedicated one of `threads`.
pub fn get_pool(threads: Option<usize>) -> Result<Arc<ThreadPool>> {
    match threads {
        None => global_pool(),
        Some(n) if (MIN_WORKER_THREADS..=MAX_WORKER_THREADS).contains(&n) => build_pool(n),
        Some(n) => Err(SpliceError::invalid_argument(
            "threads",
            n.to_string(),
            format!("must be between {MIN_WORKER_THREADS} and {MAX_WORKER_THREADS}"),
        )),
    }
}

fn global_pool() -> Result<Arc<ThreadPool>> {
    if let Some(pool) = GLOBAL_THREAD_POOL.get() {
        return Ok(pool.clone());
    }
    let pool = build_pool(default_worker_count()).or_else(|_| build_pool(MIN_WORKER_THREADS))?;
    // another thread may have won the race; use whichever was stored
    Ok(GLOBAL_THREAD_POOL.get_or_init(|| pool).clone())
}

fn build_pool(num_threads: usize) -> Result<Arc<ThreadPool>> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("image-splice-{i}"))
        .build()
        .map(Arc::new)
        .map_err(|e| {
            SpliceError::internal_panic(format!(
                "failed to build worker pool with {num_threads} threads: {e}"
            ))
        })
}
