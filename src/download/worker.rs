//! Fetching one chunk over one connection into the shared output file.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::{ChunkError, ChunkFetchError, WriteError};
use super::headers::RequestHeaders;
use super::job::{ChunkResult, ChunkStatus};
use super::plan::Chunk;
use super::progress::{ProgressSink, units_for};
use super::transport::{RequestMethod, Transport, TransportRequest};
use super::writer::WriteHandle;

/// Why a worker stopped before finishing its range.
enum WorkerStop {
    Failed(ChunkError),
    Cancelled,
}

impl From<ChunkFetchError> for WorkerStop {
    fn from(error: ChunkFetchError) -> Self {
        Self::Failed(error.into())
    }
}

impl From<WriteError> for WorkerStop {
    fn from(error: WriteError) -> Self {
        Self::Failed(error.into())
    }
}

/// Everything one worker needs; owned so it can run on its own task.
pub(crate) struct ChunkWorker {
    pub(crate) chunk: Chunk,
    pub(crate) url: Arc<str>,
    pub(crate) headers: Arc<RequestHeaders>,
    pub(crate) total_size: u64,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) writer: WriteHandle,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) read_unit_size: usize,
    /// Raced against every body read when in-flight workers should stop early.
    pub(crate) cancel: Option<CancellationToken>,
}

impl ChunkWorker {
    /// Fetches the chunk and reports a terminal result. Never panics on
    /// network or IO failures; they end up in the returned status.
    #[instrument(
        level = "debug",
        skip(self),
        fields(chunk = self.chunk.index, start = self.chunk.start, len = self.chunk.len)
    )]
    pub(crate) async fn run(self) -> ChunkResult {
        let mut bytes_written = 0;
        let status = match self.fetch(&mut bytes_written).await {
            Ok(()) => {
                debug!(bytes_written, "chunk complete");
                ChunkStatus::Succeeded
            }
            Err(WorkerStop::Cancelled) => {
                debug!(bytes_written, "chunk cancelled");
                ChunkStatus::Cancelled
            }
            Err(WorkerStop::Failed(error)) => {
                warn!(bytes_written, error = %error, "chunk failed");
                ChunkStatus::Failed(error)
            }
        };
        self.progress
            .on_chunk_done(self.chunk.index, status.is_success());

        ChunkResult {
            chunk: self.chunk,
            bytes_written,
            status,
        }
    }

    async fn fetch(&self, bytes_written: &mut u64) -> Result<(), WorkerStop> {
        let index = self.chunk.index;
        let expected = self.chunk.len;
        let unit = self.read_unit_size.max(1);
        let units_total = units_for(expected, unit);

        let Some(range) = self.chunk.byte_range() else {
            self.progress.on_chunk_progress(index, units_total, units_total);
            return Ok(());
        };

        let response = self
            .transport
            .send(TransportRequest {
                method: RequestMethod::Get,
                url: &self.url,
                headers: &self.headers,
                range: Some(range),
            })
            .await
            .map_err(ChunkFetchError::Transport)?;

        match response.status {
            206 => {}
            status if response.is_success() => {
                // A full body is only usable when this chunk is the whole resource.
                if self.chunk.start != 0 || expected != self.total_size {
                    return Err(ChunkFetchError::RangeIgnored { status }.into());
                }
            }
            status => return Err(ChunkFetchError::HttpStatus { status }.into()),
        }

        let mut body = response.body;
        let mut buffer: Vec<u8> = Vec::with_capacity(unit);
        let mut units_done = 0;

        loop {
            let next = match &self.cancel {
                Some(cancel) => tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(WorkerStop::Cancelled),
                    next = body.next() => next,
                },
                None => body.next().await,
            };
            let Some(frame) = next else { break };
            let frame = frame.map_err(ChunkFetchError::Transport)?;
            let received = *bytes_written + buffer.len() as u64 + frame.len() as u64;
            if received > expected {
                return Err(ChunkFetchError::Overrun { expected }.into());
            }

            let mut rest: &[u8] = &frame;
            while !rest.is_empty() {
                let take = (unit - buffer.len()).min(rest.len());
                buffer.extend_from_slice(&rest[..take]);
                rest = &rest[take..];

                if buffer.len() == unit {
                    self.write_unit(&mut buffer, bytes_written).await?;
                    units_done += 1;
                    self.progress.on_chunk_progress(index, units_done, units_total);
                    if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                        return Err(WorkerStop::Cancelled);
                    }
                }
            }
        }

        if !buffer.is_empty() {
            self.write_unit(&mut buffer, bytes_written).await?;
            units_done += 1;
            self.progress.on_chunk_progress(index, units_done, units_total);
        }

        if *bytes_written != expected {
            return Err(ChunkFetchError::Truncated {
                expected,
                received: *bytes_written,
            }
            .into());
        }
        Ok(())
    }

    /// Writes the staged unit at the worker's cursor and advances it.
    async fn write_unit(
        &self,
        buffer: &mut Vec<u8>,
        bytes_written: &mut u64,
    ) -> Result<(), WriteError> {
        let offset = self.chunk.start + *bytes_written;
        self.writer.write_at(offset, buffer).await?;
        *bytes_written += buffer.len() as u64;
        buffer.clear();
        Ok(())
    }
}
