//! File operation utilities for the download destination

use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{FileOperation, InstallError, Result};

/// Create (truncating) the destination file, creating parent directories
pub async fn create_destination(dest_path: &Path) -> Result<fs::File> {
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::write_failed(parent, FileOperation::CreateDir, e))?;
    }

    let file = fs::File::create(dest_path)
        .await
        .map_err(|e| InstallError::write_failed(dest_path, FileOperation::Create, e))?;
    debug!("Created download destination {}", dest_path.display());
    Ok(file)
}

/// Length of the file on disk
pub async fn file_len(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| InstallError::write_failed(path, FileOperation::Metadata, e))?;
    Ok(metadata.len())
}
