//! The request seam between the engine and the network.
//!
//! The engine only needs: issue a request (method, URL, headers, optional
//! byte range) and get back a status, response headers, and a byte stream.
//! [`HttpClient`](super::HttpClient) implements this over `reqwest`; tests
//! plug in in-process fakes.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use reqwest::header::HeaderMap;

use super::error::TransportError;
use super::headers::RequestHeaders;

/// Streamed response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// HTTP methods the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    /// Metadata-only request used for size discovery.
    Head,
    /// Body request, ranged for probes and chunks.
    Get,
}

impl RequestMethod {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Get => "GET",
        }
    }
}

/// One outbound request.
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    /// Request method.
    pub method: RequestMethod,
    /// Absolute resource URL.
    pub url: &'a str,
    /// Caller-supplied headers.
    pub headers: &'a RequestHeaders,
    /// Inclusive byte range to request, sent as `Range: bytes=<start>-<end>`.
    pub range: Option<(u64, u64)>,
}

impl TransportRequest<'_> {
    /// Value of the `Range` header for this request, if ranged.
    #[must_use]
    pub fn range_header(&self) -> Option<String> {
        self.range
            .map(|(start, end)| format!("bytes={start}-{end}"))
    }
}

/// Response head plus streamed body.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body; dropping it abandons the rest of the transfer.
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl TransportResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues requests on behalf of the engine.
///
/// Implementations must not interpret statuses: non-2xx responses are
/// returned as `Ok` and classified by the caller. Timeouts are a property of
/// the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response head with a body stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response head could be obtained.
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError>;
}
