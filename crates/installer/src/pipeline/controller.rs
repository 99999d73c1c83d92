//! Pipeline controller
//!
//! Sequences resolve → download → extract → register for one install run.
//! The download runs on its own task; archive work runs on the blocking
//! pool but is awaited before the controller moves on, so every stage
//! after the download is synchronous relative to the run.

use reqwest::Client;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;
use tracing::{error, info, info_span, warn, Instrument};

use super::events::{InstallObserver, NullObserver};
use super::state::{PipelineStatus, Stage, StageTracker};
use crate::archive::{ArchiveNormalizer, Payload};
use crate::channel::{Channel, ChannelResolver};
use crate::config::InstallerConfig;
use crate::downloader::{DownloadJob, Downloader};
use crate::error::{FileOperation, InstallError, PipelineFailure, Result};
use crate::install_dir::InstallDirectory;
use crate::registrar::{NoopRegistrar, Registrar, RegistrationRequest, ShortcutOptions, UninstallerFetcher};

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub channel: Channel,
    pub source_url: String,
    pub install_dir: PathBuf,
    pub executable_path: PathBuf,
    pub bytes_downloaded: u64,
    pub payload: Payload,
    /// Wrapper folder whose contents were promoted to the top level
    pub flattened: Option<String>,
    pub uninstaller_path: Option<PathBuf>,
    /// Leftovers of the previous install that could not be removed
    pub clear_failures: Vec<PathBuf>,
}

/// What the UI picked for the next run
#[derive(Debug, Clone, Copy, Default)]
struct Selection {
    channel: Channel,
    shortcuts: ShortcutOptions,
}

/// Drives install runs against one target directory, one run at a time
pub struct Controller {
    config: Arc<InstallerConfig>,
    resolver: ChannelResolver,
    downloader: Downloader,
    normalizer: ArchiveNormalizer,
    uninstaller: Option<UninstallerFetcher>,
    registrar: Arc<dyn Registrar>,
    observer: Arc<dyn InstallObserver>,
    selection: Mutex<Selection>,
    status: Mutex<PipelineStatus>,
    running: AtomicBool,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("install_dir", &self.config.install_dir)
            .field("status", &self.status())
            .finish()
    }
}

impl Controller {
    /// Validate `config` and build the shared HTTP client
    pub fn new(config: InstallerConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| InstallError::Configuration {
                message: format!("cannot build HTTP client: {}", e),
                field: None,
            })?;

        Ok(Self {
            resolver: ChannelResolver::new(client.clone(), &config),
            downloader: Downloader::new(client.clone(), &config),
            normalizer: ArchiveNormalizer::from_config(&config),
            uninstaller: UninstallerFetcher::from_config(client, &config),
            registrar: Arc::new(NoopRegistrar),
            observer: Arc::new(NullObserver),
            selection: Mutex::new(Selection::default()),
            status: Mutex::new(PipelineStatus::Idle),
            running: AtomicBool::new(false),
            config: Arc::new(config),
        })
    }

    pub fn with_registrar<R: Registrar + 'static>(mut self, registrar: R) -> Self {
        self.registrar = Arc::new(registrar);
        self
    }

    pub fn with_observer<O: InstallObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Channel used by the next [`start_install`](Self::start_install)
    pub fn select_channel(&self, channel: Channel) {
        lock(&self.selection).channel = channel;
    }

    pub fn set_shortcuts(&self, shortcuts: ShortcutOptions) {
        lock(&self.selection).shortcuts = shortcuts;
    }

    pub fn selected_channel(&self) -> Channel {
        lock(&self.selection).channel
    }

    pub fn status(&self) -> PipelineStatus {
        lock(&self.status).clone()
    }

    /// Run the whole pipeline once.
    ///
    /// A call made while another run is in flight fails immediately with
    /// [`InstallError::AlreadyRunning`] at stage `Idle`, without touching
    /// status or emitting events.
    pub async fn start_install(&self) -> std::result::Result<InstallOutcome, PipelineFailure> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("Install requested while another run is in flight");
            return Err(PipelineFailure::new(Stage::Idle, InstallError::AlreadyRunning));
        };

        let Selection { channel, shortcuts } = *lock(&self.selection);
        let span = info_span!(
            "install",
            channel = %channel,
            install_dir = %self.config.install_dir.display()
        );

        let result = self.run(channel, shortcuts).instrument(span).await;

        match &result {
            Ok(outcome) => {
                *lock(&self.status) = PipelineStatus::Complete;
                info!("Install complete: {}", outcome.executable_path.display());
                self.observer.on_complete(outcome);
            }
            Err(failure) => {
                *lock(&self.status) = PipelineStatus::Failed {
                    stage: failure.stage,
                    cause: failure.cause.to_string(),
                };
                error!("{}", failure);
                self.observer.on_failed(failure);
            }
        }

        result
    }

    async fn run(
        &self,
        channel: Channel,
        shortcuts: ShortcutOptions,
    ) -> std::result::Result<InstallOutcome, PipelineFailure> {
        let mut stages = StageTracker::new();

        self.enter(&mut stages, Stage::ResolvingSource);
        let source = self.resolver.resolve(channel).await.map_err(at(Stage::ResolvingSource))?;

        self.enter(&mut stages, Stage::Downloading);
        let staging = self.staging_dir().map_err(at(Stage::Downloading))?;
        let archive_path = staging.path().join(source.file_name());
        let job = self
            .downloader
            .spawn(DownloadJob::new(source.url.clone(), &archive_path))
            .finish(|progress| self.observer.on_download_progress(progress.percent))
            .await
            .map_err(at(Stage::Downloading))?;

        self.enter(&mut stages, Stage::Extracting);
        self.observer.on_extraction_progress(0);
        let normalizer = self.normalizer.clone();
        let target = InstallDirectory::new(self.config.install_dir.clone());
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&archive_path, &target))
            .await
            .map_err(|e| PipelineFailure::new(Stage::Extracting, InstallError::BackgroundTask(e)))?
            .map_err(at(Stage::Extracting))?;
        drop(staging);
        self.observer.on_extraction_progress(100);

        self.enter(&mut stages, Stage::Registering);
        let uninstaller_path = self.fetch_uninstaller().await;
        let executable_path = self.config.executable_path();
        if !executable_path.exists() {
            warn!("{} not found after install", executable_path.display());
        }
        let request = RegistrationRequest {
            install_dir: self.config.install_dir.clone(),
            installed_executable_path: executable_path.clone(),
            uninstaller_path: uninstaller_path.clone(),
            wants_desktop_shortcut: shortcuts.desktop,
            wants_start_menu_shortcut: shortcuts.start_menu,
        };
        self.registrar
            .register(&request)
            .await
            .map_err(|e| PipelineFailure::new(Stage::Registering, InstallError::RegistrationFailed(e)))?;

        self.enter(&mut stages, Stage::Complete);

        Ok(InstallOutcome {
            channel,
            source_url: source.url,
            install_dir: self.config.install_dir.clone(),
            executable_path,
            bytes_downloaded: job.bytes_received,
            payload: normalized.payload,
            flattened: normalized.flattened,
            uninstaller_path,
            clear_failures: normalized
                .clear_report
                .failures
                .into_iter()
                .map(|failure| failure.path)
                .collect(),
        })
    }

    fn enter(&self, stages: &mut StageTracker, stage: Stage) {
        if stages.advance(stage) {
            *lock(&self.status) = PipelineStatus::Running(stage);
            info!("Entering {}", stage);
            self.observer.on_stage_changed(stage);
        }
    }

    /// Fresh directory for the downloaded archive, removed on drop
    fn staging_dir(&self) -> Result<TempDir> {
        let root = self.config.staging_root();
        std::fs::create_dir_all(&root).map_err(|e| InstallError::write_failed(&root, FileOperation::CreateDir, e))?;

        tempfile::Builder::new()
            .prefix("lemonade-download-")
            .tempdir_in(&root)
            .map_err(|e| InstallError::write_failed(&root, FileOperation::CreateDir, e))
    }

    /// Best effort; a missing uninstaller never fails the run
    async fn fetch_uninstaller(&self) -> Option<PathBuf> {
        let fetcher = self.uninstaller.as_ref()?;
        match fetcher.fetch(&self.config.install_dir).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping uninstaller: {}", e);
                None
            }
        }
    }
}

fn at(stage: Stage) -> impl Fn(InstallError) -> PipelineFailure {
    move |cause| PipelineFailure::new(stage, cause)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the single-run flag for the lifetime of a run
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
