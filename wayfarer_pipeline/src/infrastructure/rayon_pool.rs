// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Rayon Pool Manager
//!
//! Stages 5 and 6 (dedupe/cluster, rank) are CPU-local work over an
//! in-memory candidate list (spec.md §5: "within stages 4-10, concurrency
//! is optional"). Rather than spin up an ad hoc thread pool per stage, we
//! keep one named, process-wide Rayon pool sized to the host, mirroring
//! the teacher's `RayonPoolManager`/`RAYON_POOLS` global singleton so CPU
//! work never competes with tokio's async executor threads.

use once_cell::sync::Lazy;
use std::sync::Arc;

/// Lazily-initialized, process-wide CPU-bound pool. Threads are named
/// `wayfarer-cpu-{i}` so they're identifiable in a profiler or `top -H`.
pub static CPU_POOL: Lazy<Arc<rayon::ThreadPool>> = Lazy::new(|| {
    let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("wayfarer-cpu-{i}"))
            .build()
            .expect("failed to build the CPU-bound rayon pool"),
    )
});

/// Runs `f` on the shared CPU pool and returns its result, blocking the
/// calling (tokio) task until it completes. Callers on an async executor
/// should wrap this in `tokio::task::spawn_blocking` if `f` is expensive
/// enough to risk starving the runtime; stage 5/6 workloads in this
/// pipeline are small enough (tens to low hundreds of candidates) that a
/// direct call is acceptable.
pub fn run_cpu_bound<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    CPU_POOL.install(f)
}
