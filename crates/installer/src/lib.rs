//! Installer Library
//!
//! Installs and upgrades an application from its published builds: resolves
//! a release channel to an archive URL, streams the archive to disk while
//! reporting progress, unpacks it into the install directory (replacing the
//! previous install) and hands off to a post-install registrar.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use installer::{Channel, ConsoleObserver, Controller, InstallerConfig, ShortcutOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstallerConfig::from_env()?;
//!
//! let controller = Controller::new(config)?.with_observer(ConsoleObserver::new(false));
//! controller.select_channel(Channel::LatestNightly);
//! controller.set_shortcuts(ShortcutOptions {
//!     desktop: true,
//!     start_menu: true,
//! });
//!
//! match controller.start_install().await {
//!     Ok(outcome) => println!("Installed to {}", outcome.install_dir.display()),
//!     Err(failure) => eprintln!("Failed at {}: {}", failure.stage, failure.cause),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`channel`]: maps a [`Channel`] to a reachable archive URL
//! - [`downloader`]: background streaming download with percentage progress
//! - [`archive`]: extraction plus nested-archive and wrapper-folder normalization
//! - [`install_dir`]: clearing and committing the install directory
//! - [`registrar`]: post-install seam and the uninstaller fetch
//! - [`pipeline`]: the controller that sequences all of the above

pub mod archive;
pub mod channel;
pub mod config;
pub mod downloader;
pub mod error;
pub mod install_dir;
pub mod pipeline;
pub mod registrar;

pub use archive::{ArchiveNormalizer, ArchiveTree, NormalizeOutcome, Payload};
pub use channel::{Channel, ChannelResolver, ResolvedSource};
pub use config::{GithubRepo, InstallerConfig, InstallerConfigBuilder, UninstallerSource};
pub use downloader::{DownloadHandle, DownloadJob, DownloadProgress, Downloader};
pub use error::{ErrorSeverity, FileOperation, InstallError, PipelineFailure, Result};
pub use install_dir::{ClearFailure, ClearReport, InstallDirectory};
pub use pipeline::{
    CompositeObserver, ConsoleObserver, Controller, EventSender, InstallObserver, InstallOutcome, NullObserver,
    PipelineEvent, PipelineStatus, Stage,
};
pub use registrar::{
    LoggingRegistrar, NoopRegistrar, Registrar, RegistrationError, RegistrationRequest, ShortcutOptions,
};
