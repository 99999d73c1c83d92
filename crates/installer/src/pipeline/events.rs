//! Pipeline events and observers
//!
//! The controller never talks to a UI directly. It reports through an
//! [`InstallObserver`]; presentation layers implement the trait or take the
//! [`EventSender`] channel route and consume [`PipelineEvent`]s on their own
//! task.

use std::path::PathBuf;
use tokio::sync::mpsc;

use super::controller::InstallOutcome;
use super::state::Stage;
use crate::error::PipelineFailure;

/// Receives pipeline events in order. All methods default to no-ops.
pub trait InstallObserver: Send + Sync {
    fn on_stage_changed(&self, _stage: Stage) {}
    fn on_download_progress(&self, _percent: u8) {}
    /// Coarse marker only: `0` when extraction starts, `100` when it succeeded
    fn on_extraction_progress(&self, _percent: u8) {}
    fn on_complete(&self, _outcome: &InstallOutcome) {}
    fn on_failed(&self, _failure: &PipelineFailure) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl InstallObserver for NullObserver {}

/// Prints pipeline events to stdout/stderr
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    pub verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl InstallObserver for ConsoleObserver {
    fn on_stage_changed(&self, stage: Stage) {
        let icon = match stage {
            Stage::ResolvingSource => "🔎",
            Stage::Downloading => "📥",
            Stage::Extracting => "📦",
            Stage::Registering => "📝",
            Stage::Complete => "✅",
            Stage::Idle => "⏸",
        };
        println!("{} {}", icon, stage);
    }

    fn on_download_progress(&self, percent: u8) {
        if self.verbose || percent % 10 == 0 {
            println!("⏬ Downloading: {}%", percent);
        }
    }

    fn on_extraction_progress(&self, percent: u8) {
        if self.verbose {
            println!("📦 Extracting: {}%", percent);
        }
    }

    fn on_complete(&self, outcome: &InstallOutcome) {
        println!(
            "✅ Installed {} to {}",
            outcome.channel,
            outcome.install_dir.display()
        );
        if !outcome.clear_failures.is_empty() {
            println!(
                "⚠️  {} entries from the previous install could not be removed",
                outcome.clear_failures.len()
            );
        }
    }

    fn on_failed(&self, failure: &PipelineFailure) {
        eprintln!("❌ Failed at {}: {}", failure.stage, failure.cause);
    }
}

/// Forwards events to several observers in registration order
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Box<dyn InstallObserver>>,
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer<O: InstallObserver + 'static>(mut self, observer: O) -> Self {
        self.observers.push(Box::new(observer));
        self
    }
}

impl InstallObserver for CompositeObserver {
    fn on_stage_changed(&self, stage: Stage) {
        for observer in &self.observers {
            observer.on_stage_changed(stage);
        }
    }

    fn on_download_progress(&self, percent: u8) {
        for observer in &self.observers {
            observer.on_download_progress(percent);
        }
    }

    fn on_extraction_progress(&self, percent: u8) {
        for observer in &self.observers {
            observer.on_extraction_progress(percent);
        }
    }

    fn on_complete(&self, outcome: &InstallOutcome) {
        for observer in &self.observers {
            observer.on_complete(outcome);
        }
    }

    fn on_failed(&self, failure: &PipelineFailure) {
        for observer in &self.observers {
            observer.on_failed(failure);
        }
    }
}

/// Owned form of every observer callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageChanged(Stage),
    DownloadProgress(u8),
    ExtractionProgress(u8),
    Complete { executable_path: PathBuf },
    Failed { stage: Stage, cause: String },
}

/// Observer that turns callbacks into [`PipelineEvent`]s on a channel
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: PipelineEvent) {
        // A dropped receiver only means nobody is watching any more
        let _ = self.tx.send(event);
    }
}

impl InstallObserver for EventSender {
    fn on_stage_changed(&self, stage: Stage) {
        self.emit(PipelineEvent::StageChanged(stage));
    }

    fn on_download_progress(&self, percent: u8) {
        self.emit(PipelineEvent::DownloadProgress(percent));
    }

    fn on_extraction_progress(&self, percent: u8) {
        self.emit(PipelineEvent::ExtractionProgress(percent));
    }

    fn on_complete(&self, outcome: &InstallOutcome) {
        self.emit(PipelineEvent::Complete {
            executable_path: outcome.executable_path.clone(),
        });
    }

    fn on_failed(&self, failure: &PipelineFailure) {
        self.emit(PipelineEvent::Failed {
            stage: failure.stage,
            cause: failure.cause.to_string(),
        });
    }
}
