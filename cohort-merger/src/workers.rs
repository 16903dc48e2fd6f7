//! Worker allocation for the merge engine's reader/flattener pool.

use crate::error::{UpdateError, UpdateResult};

/// Resolved reader/flattener thread counts for one engine invocation.
///
/// Flattening is CPU-bound and is capped below the available cores to leave
/// headroom for the orchestrating process. Reading is I/O-bound and may
/// oversubscribe, hence the separate reader multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTopology {
    /// Reader threads feeding each flattener.
    pub reader_threads: u32,
    /// Input files assigned to one flattener.
    pub readers_per_flattener: u32,
    /// Flattener workers the engine will run.
    pub flattener_count: u32,
    /// Back-computed total thread estimate. Diagnostic only; never fed back
    /// into stage parameters.
    pub projected_total_threads: u32,
}

/// Computes the worker topology for `file_count` inputs on `cpu_count` cores.
///
/// Pure: identical inputs produce identical output, keeping the engine
/// configuration reproducible and independently testable.
pub fn allocate_workers(cpu_count: i64, file_count: i64) -> UpdateResult<WorkerTopology> {
    if cpu_count <= 0 {
        return Err(UpdateError::InvalidInput {
            name: "cpu count",
            value: cpu_count,
        });
    }
    if file_count <= 0 {
        return Err(UpdateError::InvalidInput {
            name: "file count",
            value: file_count,
        });
    }

    // Two cores of headroom for the orchestrator; never below one flattener.
    let flattener_count = (cpu_count - 2).min(file_count).max(1);
    let remaining = (cpu_count - flattener_count).max(0);
    let reader_threads = (remaining / flattener_count).max(1);
    let readers_per_flattener = (file_count + flattener_count - 1) / flattener_count;

    // Recompute the totals after rounding to report what the engine will
    // actually spawn.
    let merge_threads = (file_count + readers_per_flattener) / readers_per_flattener;
    let projected_total_threads = merge_threads * reader_threads + merge_threads;

    Ok(WorkerTopology {
        reader_threads: reader_threads as u32,
        readers_per_flattener: readers_per_flattener as u32,
        flattener_count: flattener_count as u32,
        projected_total_threads: projected_total_threads as u32,
    })
}
