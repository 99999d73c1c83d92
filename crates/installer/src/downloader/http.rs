//! Streaming HTTP transfer with progress tracking

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span, Instrument};

use super::files::{create_destination, file_len};
use super::progress::ProgressSender;
use super::DownloadJob;
use crate::error::{FileOperation, InstallError, Result};

/// Declared body length, refusing absent or zero lengths.
///
/// An unbounded download cannot report progress, so it is not attempted.
pub fn declared_length(url: &str, content_length: Option<u64>) -> Result<u64> {
    match content_length {
        Some(len) if len > 0 => Ok(len),
        _ => Err(InstallError::UnknownContentLength { url: url.to_string() }),
    }
}

/// Check a finished transfer against the declared length.
///
/// Both the streamed byte count and the file on disk must match.
pub fn verify_length(url: &str, expected: u64, received: u64, on_disk: u64) -> Result<()> {
    if received == expected && on_disk == expected {
        return Ok(());
    }
    Err(InstallError::TruncatedDownload {
        url: url.to_string(),
        expected,
        actual: if on_disk != expected { on_disk } else { received },
    })
}

/// HTTP-based file downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    chunk_size: usize,
}

impl HttpDownloader {
    pub fn new(client: Client, chunk_size: usize) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Stream `job.source_url` into `job.destination`.
    ///
    /// Nothing is written to disk unless the response is a success with a
    /// usable content length. Partial files are left for the caller to clean.
    pub async fn download(&self, job: &mut DownloadJob, progress: &mut ProgressSender) -> Result<u64> {
        let url = job.source_url.clone();
        let span = info_span!("http_download", url = %url);
        async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| InstallError::unreachable(&url, e))?;

            if !response.status().is_success() {
                return Err(InstallError::bad_status(&url, response.status()));
            }

            let expected = declared_length(&url, response.content_length())?;
            job.bytes_expected = Some(expected);
            debug!("Downloading {} bytes to {}", expected, job.destination.display());

            let mut file = create_destination(&job.destination).await?;
            let mut stream = response.bytes_stream();

            while let Some(next) = stream.next().await {
                let bytes = next.map_err(|source| InstallError::TransferInterrupted {
                    url: url.clone(),
                    received: job.bytes_received,
                    source,
                })?;

                for chunk in bytes.chunks(self.chunk_size) {
                    file.write_all(chunk)
                        .await
                        .map_err(|e| InstallError::write_failed(&job.destination, FileOperation::Write, e))?;
                    job.bytes_received += chunk.len() as u64;
                    progress.report(job.bytes_received, expected).await;
                }
            }

            file.flush()
                .await
                .map_err(|e| InstallError::write_failed(&job.destination, FileOperation::Write, e))?;
            drop(file);

            let on_disk = file_len(&job.destination).await?;
            verify_length(&url, expected, job.bytes_received, on_disk)?;

            debug!("Download completed: {} bytes", on_disk);
            Ok(on_disk)
        }
        .instrument(span)
        .await
    }
}
