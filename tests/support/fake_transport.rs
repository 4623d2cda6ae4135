//! In-process [`Transport`] with randomized latency and failure injection.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use pump_core::download::{
    RequestMethod, Transport, TransportError, TransportRequest, TransportResponse,
};
use rand::Rng;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};

/// Serves one in-memory resource. Range requests get 206 unless ranges are
/// disabled, in which case every GET returns the full body with 200.
pub struct FakeTransport {
    content: Arc<[u8]>,
    range_supported: bool,
    failing_starts: HashSet<u64>,
    max_latency: Duration,
    requests: AtomicUsize,
    chunk_requests: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content: content.into(),
            range_supported: true,
            failing_starts: HashSet::new(),
            max_latency: Duration::ZERO,
            requests: AtomicUsize::new(0),
            chunk_requests: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_ranges(mut self) -> Self {
        self.range_supported = false;
        self
    }

    /// Sleeps a random duration up to `max` before the response and between frames.
    pub fn with_random_latency(mut self, max: Duration) -> Self {
        self.max_latency = max;
        self
    }

    /// Chunk requests starting at `start` get a 500.
    pub fn failing_at(mut self, start: u64) -> Self {
        self.failing_starts.insert(start);
        self
    }

    /// Every request, probes included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// GETs other than the one-byte range probe.
    pub fn chunk_request_count(&self) -> usize {
        self.chunk_requests.load(Ordering::SeqCst)
    }

    /// Highest number of chunk bodies open at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn delays(&self, count: usize) -> Vec<Duration> {
        let max = u64::try_from(self.max_latency.as_micros()).unwrap_or(u64::MAX);
        if max == 0 {
            return vec![Duration::ZERO; count];
        }
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| Duration::from_micros(rng.gen_range(0..=max)))
            .collect()
    }

    fn frames(&self, body: &[u8]) -> Vec<Bytes> {
        let mut rng = rand::thread_rng();
        let mut frames = Vec::new();
        let mut rest = body;
        while !rest.is_empty() {
            let take = rng.gen_range(1..=rest.len().min(4096));
            frames.push(Bytes::copy_from_slice(&rest[..take]));
            rest = &rest[take..];
        }
        frames
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        request: TransportRequest<'_>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let total = self.content.len() as u64;
        let mut headers = HeaderMap::new();

        if request.method == RequestMethod::Head {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(total));
            return Ok(TransportResponse {
                status: 200,
                headers,
                body: futures_util::stream::empty().boxed(),
            });
        }

        let is_probe = request.range == Some((0, 0));
        if !is_probe {
            self.chunk_requests.fetch_add(1, Ordering::SeqCst);
        }

        let (status, body) = match request.range {
            Some((start, _)) if !is_probe && self.failing_starts.contains(&start) => {
                (500, Vec::new())
            }
            Some((start, end)) if self.range_supported => {
                let end = end.min(total.saturating_sub(1));
                let (start, end) = (
                    usize::try_from(start).unwrap_or(usize::MAX),
                    usize::try_from(end).unwrap_or(usize::MAX),
                );
                (206, self.content[start..=end].to_vec())
            }
            _ => (200, self.content.to_vec()),
        };

        let frames = self.frames(&body);
        let mut delays = self.delays(frames.len() + 1);
        if let Some(first) = delays.pop() {
            tokio::time::sleep(first).await;
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let body = futures_util::stream::iter(frames.into_iter().zip(delays))
            .then(move |(frame, delay)| {
                let _held = &guard;
                async move {
                    tokio::time::sleep(delay).await;
                    Ok::<_, TransportError>(frame)
                }
            })
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
