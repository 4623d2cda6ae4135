//! Download coordinator: probe, plan, run chunk workers, aggregate results.
//!
//! # Overview
//!
//! [`DownloadCoordinator::prepare`] turns a [`DownloadRequest`] into an
//! immutable [`DownloadJob`] (probe, then plan). [`DownloadCoordinator::run`]
//! creates the output file, spawns one task per chunk, waits for all of them
//! and folds their [`ChunkResult`]s into a [`JobResult`].
//!
//! Per job: `Planned → Running → {Succeeded, Failed}`. There is no retrying
//! state; a retry is a new `prepare` + `run` by the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pump_core::download::{DownloadCoordinator, DownloadRequest, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = DownloadCoordinator::new(Arc::new(HttpClient::new()));
//! let job = coordinator
//!     .prepare(DownloadRequest::new("https://example.com/big.iso").chunk_count(8))
//!     .await?;
//! if !job.is_parallel() {
//!     println!("server does not support ranges; downloading in one piece");
//! }
//! let result = coordinator.run(&job).await?;
//! if let Some(failed) = result.first_failure() {
//!     eprintln!("{} failed: {:?}", failed.chunk, failed.error());
//! }
//! # Ok(())
//! # }
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::constants::READ_UNIT_SIZE;
use super::error::{ChunkError, ProbeError, WriteError};
use super::filename::default_output_path;
use super::job::{ChunkResult, ChunkStatus, DownloadJob, DownloadRequest, JobOutcome, JobResult};
use super::plan::{PlanError, plan, validate_request};
use super::probe::probe;
use super::progress::{NoopProgress, ProgressSink};
use super::transport::Transport;
use super::worker::ChunkWorker;
use super::writer::WriteCoordinator;

/// Error type for [`DownloadCoordinator::prepare`].
#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    /// Probing the resource failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The requested chunking is invalid.
    #[error(transparent)]
    InvalidPlan(#[from] PlanError),
}

/// What happens to other chunks once one chunk fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Workers not yet started are skipped; in-flight workers finish their range.
    #[default]
    Drain,
    /// Like `Drain`, but in-flight workers also stop at their next read unit.
    CancelInFlight,
}

/// Tuning knobs for [`DownloadCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on simultaneous chunk connections; `None` runs every chunk at once.
    pub max_connections: Option<NonZeroUsize>,
    /// Behavior after the first chunk failure.
    pub failure_policy: FailurePolicy,
    /// Bytes per positional write and progress unit.
    pub read_unit_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_connections: None,
            failure_policy: FailurePolicy::default(),
            read_unit_size: READ_UNIT_SIZE,
        }
    }
}

/// Orchestrates one or more download jobs over a shared transport.
///
/// # Concurrency Model
///
/// - Each chunk runs in its own Tokio task and owns its connection
/// - The output file is shared through a [`WriteCoordinator`]; workers only
///   hold write handles
/// - An optional semaphore caps simultaneous connections
/// - The first failure cancels a job-wide token: workers that have not yet
///   started skip their chunk
pub struct DownloadCoordinator {
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressSink>,
    options: EngineOptions,
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DownloadCoordinator {
    /// Creates a coordinator with default options and no progress reporting.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            progress: Arc::new(NoopProgress),
            options: EngineOptions::default(),
        }
    }

    /// Reports chunk progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the engine options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the configured options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Probes the resource and plans its chunks.
    ///
    /// The chunk request is validated first, so an invalid plan issues no
    /// network request. Without an explicit output path, the file name is
    /// derived from the URL in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`PrepareError::InvalidPlan`] for a zero chunk count/size and
    /// [`PrepareError::Probe`] when the probe fails.
    #[instrument(skip(self, request), fields(url = %request.url()))]
    pub async fn prepare(&self, request: DownloadRequest) -> Result<DownloadJob, PrepareError> {
        let (url, headers, count, chunk_size, output_path) = request.into_parts();
        validate_request(count, chunk_size)?;

        let capabilities = probe(self.transport.as_ref(), &url, &headers).await?;
        let chunks = plan(
            capabilities.size,
            count,
            chunk_size,
            capabilities.range_supported,
        )?;
        let output_path = output_path.unwrap_or_else(|| default_output_path(&url, Path::new(".")));

        info!(
            size = capabilities.size,
            range_supported = capabilities.range_supported,
            chunks = chunks.len(),
            path = %output_path.display(),
            "job planned"
        );

        Ok(DownloadJob {
            url: Arc::from(url),
            headers: Arc::new(headers),
            size: capabilities.size,
            range_supported: capabilities.range_supported,
            output_path,
            chunks,
        })
    }

    /// Runs a planned job to completion.
    ///
    /// Individual chunk failures do NOT cause this method to error; they are
    /// reported in the [`JobResult`]. The output file is left on disk either
    /// way.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] if the output file cannot be created, or if the
    /// final sync of an otherwise successful job fails.
    #[instrument(skip(self, job), fields(url = %job.url(), path = %job.output_path().display()))]
    pub async fn run(&self, job: &DownloadJob) -> Result<JobResult, WriteError> {
        let writer = Arc::new(WriteCoordinator::create(job.output_path()).await?);
        let abort = CancellationToken::new();
        let limiter = self
            .options
            .max_connections
            .map(|n| Arc::new(Semaphore::new(n.get())));

        info!(chunks = job.chunks().len(), size = job.size(), "job running");

        let mut handles = Vec::with_capacity(job.chunks().len());
        for &chunk in job.chunks() {
            let worker = ChunkWorker {
                chunk,
                url: Arc::clone(&job.url),
                headers: Arc::clone(&job.headers),
                total_size: job.size(),
                transport: Arc::clone(&self.transport),
                writer: writer.handle(),
                progress: Arc::clone(&self.progress),
                read_unit_size: self.options.read_unit_size,
                cancel: (self.options.failure_policy == FailurePolicy::CancelInFlight)
                    .then(|| abort.clone()),
            };
            let limiter = limiter.clone();
            let abort = abort.clone();

            handles.push((
                chunk,
                tokio::spawn(async move {
                    // Permit is dropped when this block exits (RAII)
                    let _permit = match limiter {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return not_started(&worker),
                        },
                        None => None,
                    };
                    if abort.is_cancelled() {
                        return not_started(&worker);
                    }

                    let result = worker.run().await;
                    if !result.status.is_success() {
                        abort.cancel();
                    }
                    result
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for chunk workers");

        let mut chunks = Vec::with_capacity(handles.len());
        for (chunk, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(chunk = chunk.index, error = %e, "chunk worker panicked");
                    abort.cancel();
                    self.progress.on_chunk_done(chunk.index, false);
                    ChunkResult {
                        chunk,
                        bytes_written: 0,
                        status: ChunkStatus::Failed(ChunkError::WorkerPanicked {
                            message: e.to_string(),
                        }),
                    }
                }
            };
            chunks.push(result);
        }

        let synced = writer.finish().await;

        let result = JobResult {
            output_path: job.output_path().to_path_buf(),
            size: job.size(),
            chunks,
        };

        // The chunk report of a failed job outranks a sync error.
        if let Err(e) = synced {
            if result.is_success() {
                return Err(e);
            }
            warn!(error = %e, "output sync failed after chunk failures");
        }

        match result.outcome() {
            JobOutcome::Succeeded => info!(bytes = result.bytes_written(), "job succeeded"),
            JobOutcome::Failed => {
                let failed = result.failed_chunks().count();
                if let Some(first) = result.first_failure() {
                    warn!(
                        failed,
                        chunk = first.chunk.index,
                        start = first.chunk.start,
                        end = ?first.chunk.end(),
                        error = ?first.error().map(ToString::to_string),
                        bytes = result.bytes_written(),
                        "job failed"
                    );
                } else {
                    warn!(failed, bytes = result.bytes_written(), "job failed");
                }
            }
        }

        Ok(result)
    }
}

fn not_started(worker: &ChunkWorker) -> ChunkResult {
    debug!(chunk = worker.chunk.index, "chunk skipped after earlier failure");
    worker.progress.on_chunk_done(worker.chunk.index, false);
    ChunkResult {
        chunk: worker.chunk,
        bytes_written: 0,
        status: ChunkStatus::NotStarted,
    }
}
