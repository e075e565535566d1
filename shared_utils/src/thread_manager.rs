//! Worker count resolution
//!
//! Each file is an independent CPU-bound unit of work, so by default the pool
//! gets one worker per logical core.

/// Maximum worker count accepted from configuration.
pub const MAX_WORKERS: usize = 256;

/// Logical CPU count of this machine, at least 1.
pub fn available_workers() -> usize {
    num_cpus::get().max(1)
}

/// Maps a requested worker count to the pool size: `0` means "use every
/// core", anything else is clamped to `1..=MAX_WORKERS`.
pub fn resolve_worker_count(requested: usize) -> usize {
    if requested == 0 {
        available_workers()
    } else {
        requested.clamp(1, MAX_WORKERS)
    }
}
