//! Error types for the download module.
//!
//! Probing errors abort a job before any worker starts. Chunk errors are
//! captured per worker and aggregated into the job result instead of being
//! propagated across task boundaries.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`Transport`](super::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request or a body read exceeded the transport's timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS, protocol or body-stream failure.
    #[error("network error: {source}")]
    Network {
        /// The underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransportError {
    /// Creates a network error from any error type.
    pub fn network(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Network {
            source: source.into(),
        }
    }
}

/// Errors raised while learning the resource size and range support.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The provided URL is malformed or not HTTP(S).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The probe request never produced a response.
    #[error("{method} {url} failed: {source}")]
    Transport {
        /// The probed URL.
        url: String,
        /// Request method of the failed probe.
        method: &'static str,
        /// The underlying transport error.
        #[source]
        source: TransportError,
    },

    /// The server answered a probe with a non-success status.
    #[error("HTTP {status} from {method} {url}")]
    HttpStatus {
        /// The probed URL.
        url: String,
        /// Request method of the failed probe.
        method: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The metadata response carried no usable `Content-Length`.
    #[error("server did not report a content length for {url}")]
    SizeUnknown {
        /// The probed URL.
        url: String,
    },
}

impl ProbeError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a transport error for the given probe request.
    pub fn transport(url: impl Into<String>, method: &'static str, source: TransportError) -> Self {
        Self::Transport {
            url: url.into(),
            method,
            source,
        }
    }

    /// Creates an HTTP status error for the given probe request.
    pub fn http_status(url: impl Into<String>, method: &'static str, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            method,
            status,
        }
    }

    /// Creates a size-unknown error.
    pub fn size_unknown(url: impl Into<String>) -> Self {
        Self::SizeUnknown { url: url.into() }
    }
}

/// Why a chunk's byte range could not be fetched.
#[derive(Debug, Error)]
pub enum ChunkFetchError {
    /// The ranged request was answered with a non-success status.
    #[error("HTTP {status}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// Connecting, sending, or reading the body failed.
    #[error("transport failure: {0}")]
    Transport(#[source] TransportError),

    /// The server answered a partial range with the full body.
    #[error("server ignored the range request (HTTP {status})")]
    RangeIgnored {
        /// The HTTP status code returned instead of 206.
        status: u16,
    },

    /// The body was longer than the requested range.
    #[error("server sent more than the {expected} requested bytes")]
    Overrun {
        /// Length of the requested range.
        expected: u64,
    },

    /// The body ended before the requested range was complete.
    #[error("body ended after {received} of {expected} bytes")]
    Truncated {
        /// Length of the requested range.
        expected: u64,
        /// Bytes received before the stream ended.
        received: u64,
    },
}

/// Local IO failure on the shared output file.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output file could not be created.
    #[error("failed to create {path}: {source}")]
    Create {
        /// The output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A positional write failed.
    #[error("IO error writing {len} bytes to {path} at offset {offset}: {source}")]
    Write {
        /// The output path.
        path: PathBuf,
        /// Absolute file offset of the failed write.
        offset: u64,
        /// Number of bytes in the failed write.
        len: usize,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Flushing the file to durable storage failed.
    #[error("failed to sync {path}: {source}")]
    Sync {
        /// The output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure cause of a single chunk.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Fetching the range failed.
    #[error(transparent)]
    Fetch(#[from] ChunkFetchError),

    /// Writing the fetched bytes failed.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The worker task panicked before reporting a result.
    #[error("worker task panicked: {message}")]
    WorkerPanicked {
        /// Panic payload or join error text.
        message: String,
    },
}
