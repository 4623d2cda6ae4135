//! In-memory [`Transport`] for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};

use crate::download::{
    RequestMethod, Transport, TransportError, TransportRequest, TransportResponse,
};

/// Method, range and caller headers of one request.
pub(crate) type SeenRequest = (RequestMethod, Option<(u64, u64)>, Vec<(String, String)>);

/// Serves one resource from memory, honoring ranges unless told otherwise.
pub(crate) struct MemoryTransport {
    content: Vec<u8>,
    ranges: bool,
    content_length: bool,
    failing_start: Option<(u64, u16)>,
    panicking_start: Option<u64>,
    stall: bool,
    frame_size: usize,
    requests: AtomicUsize,
    seen: Mutex<Vec<SeenRequest>>,
}

impl MemoryTransport {
    pub(crate) fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            ranges: true,
            content_length: true,
            failing_start: None,
            panicking_start: None,
            stall: false,
            frame_size: 97,
            requests: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn without_ranges(mut self) -> Self {
        self.ranges = false;
        self
    }

    pub(crate) fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }

    /// Answers `status` to the chunk request whose range starts at `start`.
    pub(crate) fn fail_range_starting_at(mut self, start: u64, status: u16) -> Self {
        self.failing_start = Some((start, status));
        self
    }

    /// Panics inside `send` for the chunk request whose range starts at `start`.
    pub(crate) fn panic_range_starting_at(mut self, start: u64) -> Self {
        self.panicking_start = Some(start);
        self
    }

    /// Body bytes after the first frame never arrive.
    pub(crate) fn stalling_after_first_frame(mut self) -> Self {
        self.stall = true;
        self
    }

    pub(crate) fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size.max(1);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// The probe's `bytes=0-0` never fails; chunk requests may.
    fn failure_for(&self, range: Option<(u64, u64)>) -> Option<u16> {
        let (start, end) = range?;
        let (failing, status) = self.failing_start?;
        (start == failing && (start, end) != (0, 0)).then_some(status)
    }

    fn respond(&self, status: u16, headers: HeaderMap, body: Vec<u8>) -> TransportResponse {
        let stall = self.stall && !body.is_empty();
        let mut frames: Vec<Result<Bytes, TransportError>> = body
            .chunks(self.frame_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let body = if stall {
            frames.truncate(1);
            futures_util::stream::iter(frames)
                .chain(futures_util::stream::pending())
                .boxed()
        } else {
            futures_util::stream::iter(frames).boxed()
        };
        TransportResponse {
            status,
            headers,
            body,
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            request.method,
            request.range,
            request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));

        let total = self.content.len() as u64;
        let mut headers = HeaderMap::new();

        if request.method == RequestMethod::Head {
            if self.content_length {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(total));
            }
            return Ok(self.respond(200, headers, Vec::new()));
        }

        if let Some(status) = self.failure_for(request.range) {
            return Ok(self.respond(status, headers, Vec::new()));
        }
        if let (Some((start, _)), Some(panicking)) = (request.range, self.panicking_start) {
            assert!(start != panicking, "connection torn down for range at {start}");
        }

        match request.range {
            Some((start, end)) if self.ranges => {
                let end = end.min(total.saturating_sub(1));
                let body = self.content[start as usize..=end as usize].to_vec();
                Ok(self.respond(206, headers, body))
            }
            _ => Ok(self.respond(200, headers, self.content.clone())),
        }
    }
}
