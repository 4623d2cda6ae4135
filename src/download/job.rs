//! Job input, the planned job, and per-chunk / per-job results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::error::ChunkError;
use super::headers::{HeaderError, RequestHeaders};
use super::plan::Chunk;

/// Caller input for [`DownloadCoordinator::prepare`](super::DownloadCoordinator::prepare).
///
/// # Example
///
/// ```
/// use pump_core::download::DownloadRequest;
///
/// let request = DownloadRequest::new("https://example.com/big.iso")
///     .chunk_count(16)
///     .with_header("Authorization", "Bearer token")
///     .unwrap();
/// assert_eq!(request.requested_count(), Some(16));
///
/// // The engine owns the Range header.
/// assert!(
///     DownloadRequest::new("https://example.com/big.iso")
///         .with_header("Range", "bytes=0-")
///         .is_err()
/// );
/// ```
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    url: String,
    headers: RequestHeaders,
    chunk_count: Option<u64>,
    chunk_size: Option<u64>,
    output_path: Option<PathBuf>,
}

impl DownloadRequest {
    /// Starts a request for `url` with no headers and default chunking.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: RequestHeaders::new(),
            chunk_count: None,
            chunk_size: None,
            output_path: None,
        }
    }

    /// Replaces the request headers.
    #[must_use]
    pub fn headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Adds one header.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Reserved`] for `Range`, or an invalid
    /// name/value error.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, HeaderError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    /// Requests a number of chunks.
    #[must_use]
    pub fn chunk_count(mut self, count: u64) -> Self {
        self.chunk_count = Some(count);
        self
    }

    /// Requests a chunk size in bytes; takes precedence over the count.
    #[must_use]
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Sets the output path instead of deriving one from the URL.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// The resource URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requested chunk count, if any.
    #[must_use]
    pub fn requested_count(&self) -> Option<u64> {
        self.chunk_count
    }

    /// Requested chunk size, if any.
    #[must_use]
    pub fn requested_size(&self) -> Option<u64> {
        self.chunk_size
    }

    pub(crate) fn into_parts(
        self,
    ) -> (String, RequestHeaders, Option<u64>, Option<u64>, Option<PathBuf>) {
        (
            self.url,
            self.headers,
            self.chunk_count,
            self.chunk_size,
            self.output_path,
        )
    }
}

/// A probed and planned download. Immutable; consumed by
/// [`DownloadCoordinator::run`](super::DownloadCoordinator::run).
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub(crate) url: Arc<str>,
    pub(crate) headers: Arc<RequestHeaders>,
    pub(crate) size: u64,
    pub(crate) range_supported: bool,
    pub(crate) output_path: PathBuf,
    pub(crate) chunks: Vec<Chunk>,
}

impl DownloadJob {
    /// The resource URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Caller-supplied headers sent with every request.
    #[must_use]
    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// Total resource size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the server honored the byte-range probe.
    #[must_use]
    pub fn range_supported(&self) -> bool {
        self.range_supported
    }

    /// Destination file.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Returns the job with a different destination file.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// The chunk plan, in offset order. Never empty.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Whether the plan fetches more than one chunk concurrently.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.chunks.len() > 1
    }
}

/// Terminal state of one chunk.
#[derive(Debug)]
pub enum ChunkStatus {
    /// The whole range was fetched and written.
    Succeeded,
    /// The worker stopped on an error.
    Failed(ChunkError),
    /// Never started because another chunk had already failed.
    NotStarted,
    /// Stopped between read units after another chunk failed.
    Cancelled,
}

impl ChunkStatus {
    /// Whether the chunk completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Short label for summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::NotStarted => "not_started",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of one chunk worker.
#[derive(Debug)]
pub struct ChunkResult {
    /// The planned chunk.
    pub chunk: Chunk,
    /// Bytes written to the output file for this chunk.
    pub bytes_written: u64,
    /// Terminal state.
    pub status: ChunkStatus,
}

impl ChunkResult {
    /// The failure cause, if the chunk failed.
    #[must_use]
    pub fn error(&self) -> Option<&ChunkError> {
        match &self.status {
            ChunkStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Overall job state after `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every chunk succeeded and the file holds `size` bytes.
    Succeeded,
    /// At least one chunk did not succeed; the file is partial.
    Failed,
}

/// Aggregated result of a job.
#[derive(Debug)]
pub struct JobResult {
    pub(crate) output_path: PathBuf,
    pub(crate) size: u64,
    pub(crate) chunks: Vec<ChunkResult>,
}

impl JobResult {
    /// The job outcome.
    #[must_use]
    pub fn outcome(&self) -> JobOutcome {
        if self.chunks.iter().all(|c| c.status.is_success()) && self.bytes_written() == self.size {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed
        }
    }

    /// Whether the job succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome() == JobOutcome::Succeeded
    }

    /// Destination file (left on disk even when the job failed).
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Declared resource size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Sum of bytes written by all chunks.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.chunks.iter().map(|c| c.bytes_written).sum()
    }

    /// Every chunk result in plan order.
    #[must_use]
    pub fn chunk_results(&self) -> &[ChunkResult] {
        &self.chunks
    }

    /// Chunks whose worker failed, in plan order.
    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkResult> {
        self.chunks.iter().filter(|c| c.error().is_some())
    }

    /// The failed chunk with the lowest index.
    #[must_use]
    pub fn first_failure(&self) -> Option<&ChunkResult> {
        self.failed_chunks().next()
    }

    /// Serializable view for reporting.
    #[must_use]
    pub fn summary(&self) -> JobSummary {
        let count = |wanted: fn(&ChunkStatus) -> bool| {
            self.chunks.iter().filter(|c| wanted(&c.status)).count()
        };
        JobSummary {
            outcome: self.outcome(),
            output_path: self.output_path.display().to_string(),
            size: self.size,
            bytes_written: self.bytes_written(),
            chunks: self.chunks.len(),
            succeeded: count(ChunkStatus::is_success),
            not_started: count(|s| matches!(s, ChunkStatus::NotStarted)),
            cancelled: count(|s| matches!(s, ChunkStatus::Cancelled)),
            failures: self
                .failed_chunks()
                .map(|c| ChunkFailureSummary {
                    index: c.chunk.index,
                    start: c.chunk.start,
                    end: c.chunk.end(),
                    bytes_written: c.bytes_written,
                    cause: c.error().map(ToString::to_string).unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Job report suitable for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    /// Overall outcome.
    pub outcome: JobOutcome,
    /// Destination file.
    pub output_path: String,
    /// Declared resource size.
    pub size: u64,
    /// Bytes written across all chunks.
    pub bytes_written: u64,
    /// Number of planned chunks.
    pub chunks: usize,
    /// Chunks that completed.
    pub succeeded: usize,
    /// Chunks skipped after an earlier failure.
    pub not_started: usize,
    /// Chunks stopped mid-transfer after an earlier failure.
    pub cancelled: usize,
    /// Every failed chunk with its byte range and cause.
    pub failures: Vec<ChunkFailureSummary>,
}

/// One failed chunk in a [`JobSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailureSummary {
    /// Chunk index.
    pub index: usize,
    /// First byte of the range.
    pub start: u64,
    /// Last byte of the range (inclusive).
    pub end: Option<u64>,
    /// Bytes written before the failure.
    pub bytes_written: u64,
    /// Failure cause.
    pub cause: String,
}
