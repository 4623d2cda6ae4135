//! Concurrent ranged downloads into a single file.
//!
//! A job fetches one HTTP resource by splitting it into contiguous byte
//! ranges (chunks), fetching each range over its own connection and writing
//! every range at its offset in the output file.
//!
//! # Features
//!
//! - Capability probe: `HEAD` for the size, a one-byte range `GET` for range support
//! - Chunk planning by count or by size, single chunk when ranges are unsupported
//! - One task per chunk, optional connection limit
//! - Serialized positional writes through a shared [`WriteCoordinator`]
//! - Per-chunk results with index, byte range and cause on failure
//! - No retries: a failed job is reported, never silently repeated
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pump_core::download::{DownloadCoordinator, DownloadRequest, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = DownloadCoordinator::new(Arc::new(HttpClient::new()));
//! let request = DownloadRequest::new("https://example.com/disk.img")
//!     .with_header("Authorization", "Bearer token")?
//!     .chunk_size(64 * 1024 * 1024);
//! let job = coordinator.prepare(request).await?;
//! let result = coordinator.run(&job).await?;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod filename;
mod headers;
mod job;
mod plan;
mod probe;
mod progress;
mod transport;
mod worker;
mod writer;

pub use client::HttpClient;
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_COUNT, READ_TIMEOUT_SECS, READ_UNIT_SIZE};
pub use engine::{DownloadCoordinator, EngineOptions, FailurePolicy, PrepareError};
pub use error::{ChunkError, ChunkFetchError, ProbeError, TransportError, WriteError};
pub use filename::{
    FALLBACK_FILENAME, default_output_path, filename_from_url, resolve_unique_path,
    sanitize_filename,
};
pub use headers::{HeaderError, RequestHeaders};
pub use job::{
    ChunkFailureSummary, ChunkResult, ChunkStatus, DownloadJob, DownloadRequest, JobOutcome,
    JobResult, JobSummary,
};
pub use plan::{Chunk, PlanError, plan, validate_request};
pub use probe::{Capabilities, probe};
pub use progress::{NoopProgress, ProgressSink, units_for};
pub use transport::{BodyStream, RequestMethod, Transport, TransportRequest, TransportResponse};
pub use writer::{WriteCoordinator, WriteHandle};

// Note: no module-local Result aliases. Use `Result<T, ProbeError>` etc.
// explicitly in function signatures.
