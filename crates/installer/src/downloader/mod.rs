//! Progress-reporting downloader
//!
//! Streams one HTTP(S) resource to a local file on a background task and
//! reports integer percentages over a bounded channel. The transfer is
//! never retried here; retry policy belongs to whoever restarts the run.

pub mod files;
pub mod http;
pub mod progress;

pub use http::{declared_length, verify_length, HttpDownloader};
pub use progress::{percent_of, DownloadProgress, ProgressSender};

use reqwest::Client;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

/// State of a single transfer.
///
/// Mutated only by the downloader. `bytes_received` never decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub source_url: String,
    pub destination: PathBuf,
    /// Declared content length, known once the response headers arrive
    pub bytes_expected: Option<u64>,
    pub bytes_received: u64,
}

impl DownloadJob {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(source_url: S, destination: P) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
            bytes_expected: None,
            bytes_received: 0,
        }
    }

    pub fn percent(&self) -> u8 {
        match self.bytes_expected {
            Some(expected) => percent_of(self.bytes_received, expected),
            None => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_expected == Some(self.bytes_received)
    }
}

/// Spawns downloads off the caller's task
#[derive(Debug, Clone)]
pub struct Downloader {
    http: HttpDownloader,
    progress_buffer: usize,
}

impl Downloader {
    pub fn new(client: Client, config: &InstallerConfig) -> Self {
        Self {
            http: HttpDownloader::new(client, config.chunk_size),
            progress_buffer: config.progress_buffer.max(1),
        }
    }

    /// Start `job` on a background task.
    ///
    /// Progress arrives on the returned handle; drain it with
    /// [`DownloadHandle::finish`].
    pub fn spawn(&self, job: DownloadJob) -> DownloadHandle {
        let (tx, rx) = mpsc::channel(self.progress_buffer);
        let http = self.http.clone();

        let task = tokio::spawn(async move {
            let mut job = job;
            let mut progress = ProgressSender::new(tx);
            http.download(&mut job, &mut progress).await?;
            Ok(job)
        });

        DownloadHandle {
            progress: rx,
            task: AbortOnDrop(task),
        }
    }

    /// Download on the current task without progress reporting
    pub async fn fetch(&self, job: DownloadJob) -> Result<DownloadJob> {
        let mut job = job;
        let mut progress = ProgressSender::detached();
        self.http.download(&mut job, &mut progress).await?;
        Ok(job)
    }
}

/// A running background download.
///
/// Dropping the handle (or a pending [`finish`](Self::finish)) aborts the
/// transfer.
#[derive(Debug)]
pub struct DownloadHandle {
    progress: mpsc::Receiver<DownloadProgress>,
    task: AbortOnDrop<Result<DownloadJob>>,
}

/// Aborts the wrapped task when dropped; a no-op once it has finished
#[derive(Debug)]
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl DownloadHandle {
    /// Forward every progress update to `on_progress`, then return the
    /// task's result.
    ///
    /// The result is only observed after the progress channel closes, so
    /// completion is always delivered after every progress update.
    pub async fn finish<F>(self, mut on_progress: F) -> Result<DownloadJob>
    where
        F: FnMut(DownloadProgress),
    {
        let DownloadHandle { mut progress, mut task } = self;

        while let Some(update) = progress.recv().await {
            on_progress(update);
        }

        (&mut task.0).await.map_err(InstallError::BackgroundTask)?
    }
}

#[cfg(test)]
pub(crate) mod test_support;
