//! Capability probing: resource size and byte-range support.

use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};
use url::Url;

use super::error::ProbeError;
use super::headers::RequestHeaders;
use super::transport::{RequestMethod, Transport, TransportRequest};

/// What the server told us about the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Declared total length in bytes.
    pub size: u64,
    /// Whether the server answered a one-byte range request with 206.
    pub range_supported: bool,
}

/// Learns the size and range support of `url`.
///
/// Issues a `HEAD` for the size, then a `GET` for `bytes=0-0`. Any 2xx other
/// than 206 on the range probe means the server ignored the range; its body
/// is dropped unread. An empty resource skips the range probe, since servers
/// answer 416 to any range of zero bytes and there is nothing to split.
///
/// No retries: transient failures go back to the caller.
///
/// # Errors
///
/// Returns [`ProbeError`] for an invalid URL, a transport failure, a
/// non-success status, or a missing/unparsable `Content-Length`.
#[instrument(skip(transport, headers), fields(url = %url))]
pub async fn probe(
    transport: &dyn Transport,
    url: &str,
    headers: &RequestHeaders,
) -> Result<Capabilities, ProbeError> {
    let parsed = Url::parse(url).map_err(|_| ProbeError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProbeError::invalid_url(url));
    }

    let size = probe_size(transport, url, headers).await?;
    let range_supported = if size == 0 {
        false
    } else {
        probe_range(transport, url, headers).await?
    };

    debug!(size, range_supported, "probe complete");
    Ok(Capabilities {
        size,
        range_supported,
    })
}

async fn probe_size(
    transport: &dyn Transport,
    url: &str,
    headers: &RequestHeaders,
) -> Result<u64, ProbeError> {
    let method = RequestMethod::Head;
    let response = transport
        .send(TransportRequest {
            method,
            url,
            headers,
            range: None,
        })
        .await
        .map_err(|e| ProbeError::transport(url, method.as_str(), e))?;

    if !response.is_success() {
        return Err(ProbeError::http_status(url, method.as_str(), response.status));
    }

    response
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| ProbeError::size_unknown(url))
}

async fn probe_range(
    transport: &dyn Transport,
    url: &str,
    headers: &RequestHeaders,
) -> Result<bool, ProbeError> {
    let method = RequestMethod::Get;
    let response = transport
        .send(TransportRequest {
            method,
            url,
            headers,
            range: Some((0, 0)),
        })
        .await
        .map_err(|e| ProbeError::transport(url, method.as_str(), e))?;

    if !response.is_success() {
        return Err(ProbeError::http_status(url, method.as_str(), response.status));
    }
    Ok(response.status == 206)
}
