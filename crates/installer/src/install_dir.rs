//! Install directory lifecycle
//!
//! The target directory's entire contents belong to the pipeline once any
//! install succeeded there. Clearing is best effort: a file still locked by
//! a running copy of the previous version is logged and skipped instead of
//! blocking the upgrade.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{InstallError, Result};

/// An entry `ensure_cleared` could not remove
#[derive(Debug)]
pub struct ClearFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

/// Outcome of [`InstallDirectory::ensure_cleared`]
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: usize,
    pub failures: Vec<ClearFailure>,
}

impl ClearReport {
    /// Some entries survived the clear (`DirectoryClearPartial`)
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// The durable installation directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirectory {
    path: PathBuf,
}

impl InstallDirectory {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every entry directly inside the directory, keeping the
    /// directory itself. A missing directory is a no-op.
    pub fn ensure_cleared(&self) -> ClearReport {
        let mut report = ClearReport::default();

        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist, nothing to clear", self.path.display());
                return report;
            }
            Err(e) => {
                warn!("Failed to list {}: {}", self.path.display(), e);
                report.failures.push(ClearFailure {
                    path: self.path.clone(),
                    error: e,
                });
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", self.path.display(), e);
                    report.failures.push(ClearFailure {
                        path: self.path.clone(),
                        error: e,
                    });
                    continue;
                }
            };

            let path = entry.path();
            match remove_entry(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!("Failed to delete {}. Reason: {}", path.display(), e);
                    report.failures.push(ClearFailure { path, error: e });
                }
            }
        }

        if report.is_partial() {
            warn!(
                "Cleared {} with {} leftover entries",
                self.path.display(),
                report.failures.len()
            );
        } else {
            debug!("Cleared {} entries from {}", report.removed, self.path.display());
        }

        report
    }

    /// Create the directory (and parents) if missing
    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .map_err(|e| InstallError::extraction(&self.path, "cannot create install directory", e))
    }

    /// Top-level entries, sorted by name
    pub fn top_level_entries(&self) -> Result<Vec<PathBuf>> {
        sorted_children(&self.path)
    }

    /// Move `source` (file or directory) to the top level of the directory,
    /// replacing any entry of the same name
    pub fn commit_entry(&self, source: &Path) -> Result<PathBuf> {
        let name = source.file_name().ok_or_else(|| InstallError::ExtractionFailed {
            path: source.to_path_buf(),
            reason: "entry has no file name".to_string(),
            source: None,
        })?;
        let destination = self.path.join(name);
        move_entry(source, &destination)?;
        Ok(destination)
    }

    /// Move every child of `wrapper` up into this directory, then remove
    /// the emptied wrapper. Returns how many entries were promoted.
    pub fn promote_children(&self, wrapper: &Path) -> Result<usize> {
        // A child named like its wrapper would land on the wrapper itself,
        // so it moves last, through a parked name
        let (clashing, others): (Vec<_>, Vec<_>) = sorted_children(wrapper)?
            .into_iter()
            .partition(|child| child.file_name() == wrapper.file_name());

        for child in &others {
            self.commit_entry(child)?;
        }
        let mut promoted = others.len();

        match clashing.first() {
            Some(child) => {
                let name = wrapper.file_name().unwrap_or_default().to_string_lossy();
                let parked = self.path.join(format!(".{}.promoting", name));
                move_entry(child, &parked)?;
                fs::remove_dir(wrapper).map_err(|e| InstallError::extraction(wrapper, "cannot remove wrapper", e))?;
                move_entry(&parked, wrapper)?;
                promoted += 1;
            }
            None => {
                fs::remove_dir(wrapper).map_err(|e| InstallError::extraction(wrapper, "cannot remove wrapper", e))?;
            }
        }

        debug!("Promoted {} entries out of {}", promoted, wrapper.display());
        Ok(promoted)
    }
}

/// Remove a file, symlink or directory tree
fn remove_entry(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| InstallError::extraction(dir, "cannot list directory", e))?;
    let mut children = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| InstallError::extraction(dir, "cannot list directory", e))?;
    children.sort();
    Ok(children)
}

/// Rename, falling back to copy-then-delete when the rename fails
/// (for instance across filesystems)
pub(crate) fn move_entry(source: &Path, destination: &Path) -> Result<()> {
    if fs::symlink_metadata(destination).is_ok() {
        debug!("Replacing existing {}", destination.display());
        remove_entry(destination)
            .map_err(|e| InstallError::extraction(destination, "cannot replace existing entry", e))?;
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename {} -> {} failed ({}), copying instead",
                source.display(),
                destination.display(),
                rename_err
            );
            copy_recursive(source, destination)?;
            remove_entry(source).map_err(|e| InstallError::extraction(source, "cannot remove moved entry", e))
        }
    }
}

fn copy_recursive(source: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            InstallError::extraction(&path, "cannot walk source tree", e)
        })?;

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| InstallError::extraction(&target, "cannot create directory", e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| InstallError::extraction(parent, "cannot create directory", e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| InstallError::extraction(entry.path(), "cannot copy file", e))?;
        }
    }
    Ok(())
}
