//! Per-chunk progress bars.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use pump_core::download::{Chunk, ProgressSink, units_for};
use tracing::debug;

const TEMPLATE: &str = "{prefix:>10} [{bar:40}] {pos}/{len} {msg}";

/// One `indicatif` bar per chunk, counted in read units.
pub(crate) struct ChunkBars {
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl ChunkBars {
    /// Bars drawn to stderr.
    pub(crate) fn new(chunks: &[Chunk], read_unit_size: usize) -> Self {
        Self::with_target(chunks, read_unit_size, ProgressDrawTarget::stderr())
    }

    fn with_target(chunks: &[Chunk], read_unit_size: usize, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bars = chunks
            .iter()
            .map(|chunk| {
                let bar = multi.add(ProgressBar::new(units_for(chunk.len, read_unit_size)));
                bar.set_style(style.clone());
                bar.set_prefix(format!("chunk {}", chunk.index));
                bar
            })
            .collect();

        Self { multi, bars }
    }

    /// Removes every bar from the terminal.
    pub(crate) fn clear(&self) {
        for bar in &self.bars {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
        if let Err(e) = self.multi.clear() {
            debug!(error = %e, "failed to clear progress bars");
        }
    }
}

impl ProgressSink for ChunkBars {
    fn on_chunk_progress(&self, chunk_index: usize, units_done: u64, units_total: u64) {
        if let Some(bar) = self.bars.get(chunk_index) {
            bar.set_length(units_total);
            bar.set_position(units_done);
        }
    }

    fn on_chunk_done(&self, chunk_index: usize, success: bool) {
        if let Some(bar) = self.bars.get(chunk_index) {
            if success {
                bar.finish_with_message("done");
            } else {
                bar.abandon_with_message("failed");
            }
        }
    }
}
