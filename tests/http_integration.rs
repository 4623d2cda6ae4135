//! End-to-end downloads over real HTTP against a range-aware mock server.

use std::sync::Arc;

use pump_core::download::{ChunkError, ChunkFetchError, ProbeError};
use pump_core::{DownloadCoordinator, DownloadRequest, HttpClient, JobOutcome, PrepareError};
use tempfile::TempDir;
use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

mod support;
use support::payload;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

/// Answers `Range: bytes=s-e` with 206 and the slice, or with the full body
/// when ranges are disabled.
struct RangeResponder {
    content: Vec<u8>,
    honor_ranges: bool,
    failing_start: Option<u64>,
}

impl RangeResponder {
    fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            honor_ranges: true,
            failing_start: None,
        }
    }
}

fn parse_range(request: &Request) -> Option<(usize, usize)> {
    let raw = request.headers.get("range")?.to_str().ok()?;
    let (start, end) = raw.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let total = self.content.len();
        match parse_range(request) {
            Some((start, end)) if self.failing_start == Some(start as u64) && end > 0 => {
                ResponseTemplate::new(503)
            }
            Some((start, end)) if self.honor_ranges && start < total => {
                let end = end.min(total - 1);
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", format!("bytes {start}-{end}/{total}").as_str())
                    .set_body_bytes(self.content[start..=end].to_vec())
            }
            _ => ResponseTemplate::new(200).set_body_bytes(self.content.clone()),
        }
    }
}

async fn mount_file(server: &MockServer, route: &str, responder: RangeResponder) {
    let len = responder.content.len();
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", len.to_string().as_str())
                .set_body_bytes(responder.content.clone()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(responder)
        .mount(server)
        .await;
}

fn coordinator() -> DownloadCoordinator {
    DownloadCoordinator::new(Arc::new(HttpClient::new()))
}

#[tokio::test]
async fn test_http_parallel_download_reassembles_file() {
    let server = require_mock_server!();
    let data = payload(300_000);
    mount_file(&server, "/disk.img", RangeResponder::new(data.clone())).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("disk.img");
    let coordinator = coordinator();

    let job = coordinator
        .prepare(
            DownloadRequest::new(format!("{}/disk.img", server.uri()))
                .chunk_count(8)
                .output_path(&out),
        )
        .await
        .unwrap();
    assert!(job.range_supported());
    assert_eq!(job.size(), 300_000);

    let result = coordinator.run(&job).await.unwrap();
    assert!(result.is_success(), "{:?}", result.summary());
    assert_eq!(std::fs::read(&out).unwrap(), data);
}

#[tokio::test]
async fn test_http_caller_headers_and_user_agent_are_sent() {
    let server = require_mock_server!();
    let data = payload(10_000);
    Mock::given(method("HEAD"))
        .and(path("/private.bin"))
        .and(header("authorization", "Bearer secret"))
        .and(header_regex("user-agent", "^pump/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", "10000")
                .set_body_bytes(data.clone()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private.bin"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(RangeResponder::new(data.clone()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("private.bin");
    let coordinator = coordinator();
    let job = coordinator
        .prepare(
            DownloadRequest::new(format!("{}/private.bin", server.uri()))
                .with_header("Authorization", "Bearer secret")
                .unwrap()
                .chunk_count(3)
                .output_path(&out),
        )
        .await
        .unwrap();
    let result = coordinator.run(&job).await.unwrap();

    assert!(result.is_success(), "{:?}", result.summary());
    assert_eq!(std::fs::read(&out).unwrap(), data);
}

#[tokio::test]
async fn test_http_server_without_ranges_downloads_single_chunk() {
    let server = require_mock_server!();
    let data = payload(50_000);
    let mut responder = RangeResponder::new(data.clone());
    responder.honor_ranges = false;
    mount_file(&server, "/plain.bin", responder).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("plain.bin");
    let coordinator = coordinator();

    let job = coordinator
        .prepare(
            DownloadRequest::new(format!("{}/plain.bin", server.uri()))
                .chunk_count(8)
                .output_path(&out),
        )
        .await
        .unwrap();
    assert!(!job.is_parallel());

    let result = coordinator.run(&job).await.unwrap();
    assert!(result.is_success());
    assert_eq!(std::fs::read(&out).unwrap(), data);
}

#[tokio::test]
async fn test_http_missing_resource_fails_probe() {
    let server = require_mock_server!();
    Mock::given(method("HEAD"))
        .and(path("/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = coordinator()
        .prepare(DownloadRequest::new(format!("{}/missing.bin", server.uri())))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            PrepareError::Probe(ProbeError::HttpStatus { status: 404, .. })
        ),
        "{err}"
    );
}

#[tokio::test]
async fn test_http_chunk_error_status_reported() {
    let server = require_mock_server!();
    let data = payload(4_000);
    let mut responder = RangeResponder::new(data);
    // Chunk 2 of 4 starts at byte 2000.
    responder.failing_start = Some(2_000);
    mount_file(&server, "/flaky.bin", responder).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("flaky.bin");
    let coordinator = coordinator();
    let job = coordinator
        .prepare(
            DownloadRequest::new(format!("{}/flaky.bin", server.uri()))
                .chunk_count(4)
                .output_path(&out),
        )
        .await
        .unwrap();
    let result = coordinator.run(&job).await.unwrap();

    assert_eq!(result.outcome(), JobOutcome::Failed);
    let failure = result.first_failure().unwrap();
    assert_eq!(failure.chunk.index, 2);
    assert!(matches!(
        failure.error(),
        Some(ChunkError::Fetch(ChunkFetchError::HttpStatus { status: 503 }))
    ));
    assert!(out.exists());
}
