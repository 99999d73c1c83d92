//! Post-install registration
//!
//! Shortcut creation and uninstall-entry registration are platform side
//! effects that live outside this crate. The controller only decides when
//! to call a [`Registrar`] and with what; it folds the registrar's answer
//! into its own terminal state.

pub mod uninstaller;

pub use uninstaller::UninstallerFetcher;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Shortcut preferences chosen by the UI together with the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutOptions {
    pub desktop: bool,
    pub start_menu: bool,
}

/// Everything a registrar needs to know about a finished install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub install_dir: PathBuf,
    pub installed_executable_path: PathBuf,
    /// Present when the standalone uninstaller was fetched into `install_dir`
    pub uninstaller_path: Option<PathBuf>,
    pub wants_desktop_shortcut: bool,
    pub wants_start_menu_shortcut: bool,
}

/// Failures reported back by a registrar
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Failed to create shortcut '{path}': {reason}")]
    Shortcut { path: PathBuf, reason: String },

    #[error("Failed to register uninstall entry: {0}")]
    UninstallEntry(String),

    #[error("{0}")]
    Other(String),
}

/// Post-install side effects, invoked once after a successful install
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), RegistrationError>;
}

/// Registrar that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistrar;

#[async_trait]
impl Registrar for NoopRegistrar {
    async fn register(&self, _request: &RegistrationRequest) -> Result<(), RegistrationError> {
        Ok(())
    }
}

/// Registrar that only logs what a platform registrar would do
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRegistrar;

#[async_trait]
impl Registrar for LoggingRegistrar {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), RegistrationError> {
        let exe = request.installed_executable_path.display();
        if request.wants_desktop_shortcut {
            info!("Would create desktop shortcut to {}", exe);
        }
        if request.wants_start_menu_shortcut {
            info!("Would create start menu shortcut to {}", exe);
        }
        match &request.uninstaller_path {
            Some(path) => info!("Would register uninstall entry for {}", path.display()),
            None => info!("No uninstaller available, skipping uninstall entry"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            install_dir: PathBuf::from("/opt/lemonade"),
            installed_executable_path: PathBuf::from("/opt/lemonade/lemonade-qt.exe"),
            uninstaller_path: None,
            wants_desktop_shortcut: true,
            wants_start_menu_shortcut: false,
        }
    }

    #[tokio::test]
    async fn test_builtin_registrars_succeed() {
        assert!(NoopRegistrar.register(&request()).await.is_ok());
        assert!(LoggingRegistrar.register(&request()).await.is_ok());
    }

    #[test]
    fn test_registration_error_messages() {
        let err = RegistrationError::Shortcut {
            path: PathBuf::from("/home/u/Desktop/Lemonade.lnk"),
            reason: "access denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create shortcut '/home/u/Desktop/Lemonade.lnk': access denied"
        );
    }
}
