//! Human-readable rendering of sizes and job results.

use std::fmt::Write as _;

use pump_core::{JobResult, JobSummary};

const UNITS: [&str; 5] = ["B", "kiB", "MiB", "GiB", "TiB"];

/// Formats a byte count in binary units with two decimals, e.g. `1.50 MiB`.
///
/// A value moves to the next unit only once it exceeds 1024 of the current
/// one; `TiB` is the largest unit.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_bytes(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// One-line plan announcement.
pub(crate) fn fetching_line(size: u64, chunks: usize) -> String {
    let noun = if chunks == 1 { "chunk" } else { "chunks" };
    format!("Fetching {} in {chunks} {noun}", format_bytes(size))
}

/// Report for a finished job: a success line, or the failed chunks with
/// index, byte range and cause.
pub(crate) fn render_result(result: &JobResult) -> String {
    let summary = result.summary();
    let mut out = String::new();
    if result.is_success() {
        let _ = write!(
            out,
            "Saved {} to {}",
            format_bytes(summary.bytes_written),
            summary.output_path
        );
        return out;
    }

    let _ = writeln!(
        out,
        "Download failed: {} of {} written to {} (partial file kept)",
        format_bytes(summary.bytes_written),
        format_bytes(summary.size),
        summary.output_path
    );
    for failure in &summary.failures {
        let range = failure
            .end
            .map_or_else(|| "empty".to_string(), |end| format!("bytes {}-{end}", failure.start));
        let _ = writeln!(out, "  chunk {} ({range}): {}", failure.index, failure.cause);
    }
    let _ = write!(out, "{}", counts_line(&summary));
    out
}

fn counts_line(summary: &JobSummary) -> String {
    format!(
        "{} of {} chunks succeeded, {} failed, {} not started, {} cancelled",
        summary.succeeded,
        summary.chunks,
        summary.failures.len(),
        summary.not_started,
        summary.cancelled
    )
}
