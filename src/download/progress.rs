//! Per-chunk progress reporting.
//!
//! Workers report one unit per read unit written, then a terminal event.
//! Sinks are observers only: whatever a sink does has no effect on the
//! download outcome, so [`NoopProgress`] is always a valid substitute.

/// Receives progress events from chunk workers.
///
/// Called concurrently from every worker of a job; implementations must be
/// cheap and must not block.
pub trait ProgressSink: Send + Sync {
    /// `units_done` of `units_total` read units of chunk `chunk_index` are on disk.
    fn on_chunk_progress(&self, chunk_index: usize, units_done: u64, units_total: u64);

    /// Chunk `chunk_index` reached a terminal state.
    fn on_chunk_done(&self, chunk_index: usize, success: bool);
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_chunk_progress(&self, _chunk_index: usize, _units_done: u64, _units_total: u64) {}

    fn on_chunk_done(&self, _chunk_index: usize, _success: bool) {}
}

/// Number of read units needed for `len` bytes (at least one, so that even an
/// empty chunk shows a completed bar).
#[must_use]
pub fn units_for(len: u64, unit_size: usize) -> u64 {
    len.div_ceil(unit_size.max(1) as u64).max(1)
}
