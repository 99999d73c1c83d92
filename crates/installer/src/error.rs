//! Error types for the install pipeline
//!
//! Every failure the pipeline can surface maps onto one variant of
//! [`InstallError`]. None of them are retried internally; the controller
//! wraps the cause together with the stage it happened in as a
//! [`PipelineFailure`] and hands it to the caller verbatim.

use std::error::Error;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::pipeline::Stage;
use crate::registrar::RegistrationError;

/// Failures of the install pipeline, with the URL or path that caused them
#[derive(Error, Debug)]
pub enum InstallError {
    /// A listing endpoint or download URL could not be queried or answered
    /// with a non-success status
    #[error("Source '{url}' is unreachable: {reason}")]
    SourceUnreachable {
        url: String,
        reason: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The release listing was readable but nothing in it matched
    #[error("No release asset matching '{pattern}' found at '{listing_url}'")]
    NoMatchingAsset { listing_url: String, pattern: String },

    /// The server omitted the content length or declared zero bytes
    #[error("Server did not declare a usable content length for '{url}'")]
    UnknownContentLength { url: String },

    /// Network read failure in the middle of the body stream
    #[error("Transfer from '{url}' interrupted after {received} bytes")]
    TransferInterrupted {
        url: String,
        received: u64,
        #[source]
        source: reqwest::Error,
    },

    /// Local write failure (disk full, permission denied)
    #[error("Failed {operation} '{path}'")]
    WriteFailed {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// The body ended cleanly but its length disagrees with the declared one
    #[error("Download of '{url}' truncated: expected {expected} bytes, got {actual} bytes")]
    TruncatedDownload {
        url: String,
        expected: u64,
        actual: u64,
    },

    /// Any failure while unpacking or moving payload files
    #[error("Extraction failed at '{path}': {reason}")]
    ExtractionFailed {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// The post-install registrar reported a failure
    #[error("Post-install registration failed")]
    RegistrationFailed(#[source] RegistrationError),

    /// A background download or extraction task panicked or was aborted
    #[error("Background task failed")]
    BackgroundTask(#[source] tokio::task::JoinError),

    /// `start_install` was called while another run was in flight
    #[error("An install is already running against this controller")]
    AlreadyRunning,

    /// Invalid configuration values
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Copy,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Copy => write!(f, "copying"),
            FileOperation::Metadata => write!(f, "reading metadata of"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

/// Error severity levels for prioritization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

pub type Result<T> = std::result::Result<T, InstallError>;

impl InstallError {
    pub(crate) fn unreachable(url: &str, source: reqwest::Error) -> Self {
        InstallError::SourceUnreachable {
            url: url.to_string(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn bad_status(url: &str, status: reqwest::StatusCode) -> Self {
        InstallError::SourceUnreachable {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
            source: None,
        }
    }

    pub(crate) fn write_failed(path: &Path, operation: FileOperation, source: std::io::Error) -> Self {
        InstallError::WriteFailed {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }

    pub(crate) fn extraction<E>(path: &Path, reason: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        InstallError::ExtractionFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn configuration(field: &str, message: impl Into<String>) -> Self {
        InstallError::Configuration {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Whether a fresh run from `Idle` has a reasonable chance to succeed.
    ///
    /// Informational only: the pipeline itself never retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            InstallError::SourceUnreachable { .. } => true,
            InstallError::TransferInterrupted { .. } => true,
            InstallError::TruncatedDownload { .. } => true,
            InstallError::AlreadyRunning => true,
            InstallError::NoMatchingAsset { .. } => false,
            InstallError::UnknownContentLength { .. } => false,
            InstallError::WriteFailed { .. } => false,
            InstallError::ExtractionFailed { .. } => false,
            InstallError::RegistrationFailed(_) => false,
            InstallError::BackgroundTask(_) => false,
            InstallError::Configuration { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            InstallError::SourceUnreachable { .. } => "source_unreachable",
            InstallError::NoMatchingAsset { .. } => "no_matching_asset",
            InstallError::UnknownContentLength { .. } => "unknown_content_length",
            InstallError::TransferInterrupted { .. } => "transfer_interrupted",
            InstallError::WriteFailed { .. } => "write_failed",
            InstallError::TruncatedDownload { .. } => "truncated_download",
            InstallError::ExtractionFailed { .. } => "extraction_failed",
            InstallError::RegistrationFailed(_) => "registration_failed",
            InstallError::BackgroundTask(_) => "background_task",
            InstallError::AlreadyRunning => "already_running",
            InstallError::Configuration { .. } => "configuration",
        }
    }

    /// Get severity level for error prioritization
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            InstallError::SourceUnreachable { .. } => ErrorSeverity::Medium,
            InstallError::NoMatchingAsset { .. } => ErrorSeverity::Medium,
            InstallError::UnknownContentLength { .. } => ErrorSeverity::Medium,
            InstallError::TransferInterrupted { .. } => ErrorSeverity::Medium,
            InstallError::TruncatedDownload { .. } => ErrorSeverity::High,
            InstallError::WriteFailed { .. } => ErrorSeverity::Critical,
            // The target directory may now be half-written
            InstallError::ExtractionFailed { .. } => ErrorSeverity::Critical,
            InstallError::RegistrationFailed(_) => ErrorSeverity::High,
            InstallError::BackgroundTask(_) => ErrorSeverity::High,
            InstallError::AlreadyRunning => ErrorSeverity::Low,
            InstallError::Configuration { .. } => ErrorSeverity::High,
        }
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Severity: {:?}\n", self.severity()));
        report.push_str(&format!("Recoverable: {}\n", self.is_recoverable()));

        if let Some(source) = self.source() {
            report.push_str(&format!("Root cause: {}\n", source));
        }

        report
    }
}

/// Terminal `Failed(stage, cause)` state of a pipeline run
#[derive(Error, Debug)]
#[error("{stage} failed: {cause}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub cause: InstallError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, cause: InstallError) -> Self {
        Self { stage, cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failed_message_names_path_and_operation() {
        let err = InstallError::write_failed(
            Path::new("/tmp/archive.zip"),
            FileOperation::Write,
            std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"),
        );

        assert_eq!(err.to_string(), "Failed writing '/tmp/archive.zip'");
        assert_eq!(err.category(), "write_failed");
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.detailed_report().contains("Root cause: disk full"));
    }

    #[test]
    fn test_pipeline_failure_display_includes_stage() {
        let failure = PipelineFailure::new(
            Stage::Downloading,
            InstallError::UnknownContentLength {
                url: "https://example.com/app.zip".to_string(),
            },
        );

        assert_eq!(
            failure.to_string(),
            "Downloading failed: Server did not declare a usable content length for 'https://example.com/app.zip'"
        );
        assert!(!failure.cause.is_recoverable());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::High);
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
    }
}
