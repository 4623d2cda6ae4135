//! HTTP transport over `reqwest`.
//!
//! This module provides the `HttpClient` struct which sends the probe and
//! chunk requests with timeout configuration and streams response bodies.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::RANGE;
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::TransportError;
use super::transport::{RequestMethod, Transport, TransportRequest, TransportResponse};
use crate::user_agent;

/// HTTP client for probe and chunk requests.
///
/// This client is designed to be created once and shared by every worker of
/// a job, taking advantage of connection pooling. Each in-flight chunk still
/// uses its own connection.
///
/// Transparent decompression is disabled: a byte range addresses the stored
/// representation, so decoding would break offsets.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pump_core::download::{DownloadCoordinator, DownloadRequest, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let coordinator = DownloadCoordinator::new(Arc::new(HttpClient::new()));
/// let job = coordinator
///     .prepare(DownloadRequest::new("https://example.com/file.iso").output_path("file.iso"))
///     .await?;
/// let result = coordinator.run(&job).await?;
/// println!("{} bytes written", result.bytes_written());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes between body reads
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        Self::try_new_with_timeouts(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Fallible variant of [`new_with_timeouts`](Self::new_with_timeouts).
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error (e.g. TLS backend initialization).
    #[instrument(level = "debug")]
    pub fn try_new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(
        level = "debug",
        skip(self, request),
        fields(method = request.method.as_str(), url = %request.url, range = ?request.range)
    )]
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            RequestMethod::Head => self.client.head(request.url),
            RequestMethod::Get => self.client.get(request.url),
        };
        builder = builder.headers(request.headers.to_header_map());
        if let Some(range) = request.range_header() {
            builder = builder.header(RANGE, range);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(status, "response received");

        let body = response
            .bytes_stream()
            .map(|item| item.map_err(map_reqwest_error))
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::network(error)
    }
}
