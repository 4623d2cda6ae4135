//! Shared output file with serialized positional writes.
//!
//! The file has a single cursor, so a seek followed by a write must not
//! interleave with any other worker's seek/write. [`WriteCoordinator`] owns
//! the handle behind one mutex whose critical section is exactly one
//! seek + write; workers only ever see a [`WriteHandle`].

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

use super::error::WriteError;

/// Owner of the output file for one job.
#[derive(Debug)]
pub struct WriteCoordinator {
    path: PathBuf,
    file: Mutex<File>,
}

impl WriteCoordinator {
    /// Creates (or truncates) the output file. No space is pre-allocated: the
    /// file reaches its final length once every chunk has been written.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Create`] if the file cannot be created.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|source| WriteError::Create {
                path: path.clone(),
                source,
            })?;
        debug!("output file created");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `bytes` at absolute `offset`.
    ///
    /// Atomic with respect to other `write_at` calls: the guard is held for
    /// the seek and the complete write, and released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Write`] if seeking or writing fails.
    pub async fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<(), WriteError> {
        let map_err = |source| WriteError::Write {
            path: self.path.clone(),
            offset,
            len: bytes.len(),
            source,
        };

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await.map_err(map_err)?;
        file.write_all(bytes).await.map_err(map_err)?;
        // Completes the background write so its error is reported here and
        // not to whichever writer takes the guard next.
        file.flush().await.map_err(map_err)?;
        drop(file);

        trace!(offset, len = bytes.len(), "bytes written");
        Ok(())
    }

    /// Flushes and syncs the file to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Sync`] if the flush or fsync fails.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn finish(&self) -> Result<(), WriteError> {
        let map_err = |source| WriteError::Sync {
            path: self.path.clone(),
            source,
        };
        let mut file = self.file.lock().await;
        file.flush().await.map_err(map_err)?;
        file.sync_all().await.map_err(map_err)?;
        debug!("output file synced");
        Ok(())
    }

    /// Creates a write capability for a worker.
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> WriteHandle {
        WriteHandle {
            coordinator: Arc::clone(self),
        }
    }
}

/// A worker's capability to write into the shared output file.
///
/// Exposes [`write_at`](Self::write_at) only; the handle cannot close,
/// truncate or otherwise touch the file.
#[derive(Debug, Clone)]
pub struct WriteHandle {
    coordinator: Arc<WriteCoordinator>,
}

impl WriteHandle {
    /// See [`WriteCoordinator::write_at`].
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Write`] if seeking or writing fails.
    pub async fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<(), WriteError> {
        self.coordinator.write_at(offset, bytes).await
    }
}
