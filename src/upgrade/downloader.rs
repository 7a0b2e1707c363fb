//! Streaming artifact download.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::{InstallStage, Result, UpdateError};
use crate::transport::{HttpRequest, TransportClient};

/// Progress is reported at most once per this many downloaded bytes.
pub const PROGRESS_INTERVAL: u64 = 100 * 1024;

/// Shared flag that stops a running download between two chunks.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a finished download wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Bytes written to the destination.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of those bytes.
    pub sha256: String,
}

/// Streams an artifact to a local file.
///
/// The destination is created with `create_new` before the request is sent,
/// so an existing file is never overwritten. On every failure path the
/// partially written destination is removed.
#[derive(Debug)]
pub struct Downloader<T> {
    transport: Option<Arc<T>>,
    user_agent: String,
}

impl<T: TransportClient> Downloader<T> {
    pub fn new(transport: Option<Arc<T>>, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
        }
    }

    /// Download `url` into `destination`.
    ///
    /// `progress` receives the cumulative byte count each time another
    /// [`PROGRESS_INTERVAL`] bytes have arrived, and once more when the
    /// transfer completes unless that count was just reported.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancellationFlag,
    ) -> Result<DownloadSummary> {
        let transport = self.transport.as_ref().ok_or(UpdateError::TransportUnavailable)?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .await
            .map_err(|e| UpdateError::filesystem(InstallStage::OpenDestination, destination, e))?;

        info!("Downloading {} to {}", url, destination.display());
        let result = self.stream_into(transport, url, file, destination, progress, cancel).await;

        if let Err(e) = &result {
            debug!("Download failed ({}), removing {}", e, destination.display());
            if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                warn!(
                    "Failed to remove partial download {}: {}",
                    destination.display(),
                    remove_err
                );
            }
        }
        result
    }

    async fn stream_into(
        &self,
        transport: &T,
        url: &str,
        mut file: File,
        destination: &Path,
        progress: &mut (dyn FnMut(u64) + Send),
        cancel: &CancellationFlag,
    ) -> Result<DownloadSummary> {
        let transport_error = |e: crate::transport::TransportError| UpdateError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let write_error = |e: std::io::Error| {
            UpdateError::filesystem(InstallStage::WriteDownload, destination, e)
        };

        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/octet-stream");
        let response = transport.get(request).await.map_err(transport_error)?;

        if response.status != 200 {
            return Err(UpdateError::DownloadError {
                status: response.status,
            });
        }

        let mut body = response.body;
        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut last_reported: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(UpdateError::Cancelled);
            }

            let Some(chunk) = body.next().await else {
                break;
            };
            let chunk = chunk.map_err(transport_error)?;

            file.write_all(&chunk).await.map_err(write_error)?;
            hasher.update(&chunk);
            total += chunk.len() as u64;

            if total - last_reported >= PROGRESS_INTERVAL {
                progress(total);
                last_reported = total;
            }
        }

        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        if total != last_reported {
            progress(total);
        }

        let sha256 = hex::encode(hasher.finalize());
        info!("Downloaded {} bytes (sha256 {})", total, sha256);
        Ok(DownloadSummary {
            bytes: total,
            sha256,
        })
    }
}
