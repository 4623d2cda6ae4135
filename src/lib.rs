//! Pump Core Library
//!
//! Concurrent, range-based HTTP downloads: probe a resource, split it into
//! byte ranges, fetch every range over its own connection and reassemble
//! the ranges in one output file.
//!
//! # Architecture
//!
//! - [`download`] - probe, chunk planning, workers, write coordination and
//!   the job coordinator
//!
//! The `pump` binary in this package is a thin CLI over [`DownloadCoordinator`].

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub(crate) mod user_agent;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_support;

// Re-export commonly used types
pub use download::{
    Chunk, ChunkResult, ChunkStatus, DownloadCoordinator, DownloadJob, DownloadRequest,
    EngineOptions, FailurePolicy, HttpClient, JobOutcome, JobResult, JobSummary, PrepareError,
    ProgressSink, RequestHeaders, Transport,
};
