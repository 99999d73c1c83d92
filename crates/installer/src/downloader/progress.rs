//! Download progress reporting
//!
//! Progress leaves the download task over a bounded channel. Intermediate
//! percentages are best effort and may be dropped when the consumer lags;
//! the final 100% update is always delivered.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// One progress step of a running download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// `bytes_received / bytes_expected` as an integer percentage, `0..=100`
    pub percent: u8,
    pub bytes_received: u64,
    pub bytes_expected: u64,
}

/// Integer percentage of `received` out of `expected`, clamped to 100
pub fn percent_of(received: u64, expected: u64) -> u8 {
    if expected == 0 {
        return 100;
    }
    let clamped = received.min(expected) as u128;
    ((clamped * 100) / expected as u128) as u8
}

/// Sending half used by the download task.
///
/// Only strictly increasing percentages are sent, so the consumer always
/// observes a non-decreasing sequence.
#[derive(Debug)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<DownloadProgress>>,
    last_sent: Option<u8>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<DownloadProgress>) -> Self {
        Self {
            tx: Some(tx),
            last_sent: None,
        }
    }

    /// A sender that reports nowhere, for downloads nobody watches
    pub fn detached() -> Self {
        Self {
            tx: None,
            last_sent: None,
        }
    }

    /// Highest percentage delivered so far
    pub fn last_sent(&self) -> Option<u8> {
        self.last_sent
    }

    pub async fn report(&mut self, bytes_received: u64, bytes_expected: u64) {
        let percent = percent_of(bytes_received, bytes_expected);
        if self.last_sent.is_some_and(|last| percent <= last) {
            return;
        }

        let Some(tx) = self.tx.as_ref() else {
            return;
        };

        let update = DownloadProgress {
            percent,
            bytes_received,
            bytes_expected,
        };

        if percent == 100 {
            // Completion must not be dropped; wait for room
            if tx.send(update).await.is_err() {
                debug!("Progress receiver gone before completion update");
                self.tx = None;
                return;
            }
            self.last_sent = Some(percent);
            return;
        }

        match tx.try_send(update) {
            Ok(()) => self.last_sent = Some(percent),
            Err(TrySendError::Full(_)) => {
                debug!("Progress consumer lagging, dropped {}% update", percent);
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Progress channel closed, continuing download without updates");
                self.tx = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 200), 0);
        assert_eq!(percent_of(1, 200), 0);
        assert_eq!(percent_of(100, 200), 50);
        assert_eq!(percent_of(199, 200), 99);
        assert_eq!(percent_of(200, 200), 100);
        assert_eq!(percent_of(500, 200), 100);
        assert_eq!(percent_of(u64::MAX, u64::MAX), 100);
    }

    #[tokio::test]
    async fn test_only_increasing_percentages_are_sent() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut sender = ProgressSender::new(tx);

        for received in [10, 10, 20, 15, 50, 100] {
            sender.report(received, 100).await;
        }
        drop(sender);

        let mut seen = Vec::new();
        while let Some(update) = rx.recv().await {
            seen.push(update.percent);
        }
        assert_eq!(seen, vec![10, 20, 50, 100]);
    }

    #[tokio::test]
    async fn test_intermediate_updates_dropped_under_backpressure() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sender = ProgressSender::new(tx);

        sender.report(10, 100).await;
        // Channel is full, these are dropped rather than blocking
        sender.report(20, 100).await;
        sender.report(30, 100).await;
        assert_eq!(sender.last_sent(), Some(10));

        let consumer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(update) = rx.recv().await {
                seen.push(update.percent);
            }
            seen
        });

        sender.report(100, 100).await;
        drop(sender);

        let seen = consumer.await.unwrap();
        assert_eq!(seen, vec![10, 100]);
    }

    #[tokio::test]
    async fn test_closed_receiver_does_not_fail() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut sender = ProgressSender::new(tx);

        sender.report(50, 100).await;
        sender.report(100, 100).await;
        assert_eq!(sender.last_sent(), None);
    }

    #[tokio::test]
    async fn test_detached_sender_is_silent() {
        let mut sender = ProgressSender::detached();
        sender.report(100, 100).await;
        assert_eq!(sender.last_sent(), None);
    }
}
