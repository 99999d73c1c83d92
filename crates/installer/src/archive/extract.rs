//! Zip extraction

use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use super::tree::{ArchiveEntry, ArchiveTree};
use crate::error::{InstallError, Result};

/// Extract every entry of `archive_path` under `destination`.
///
/// Returns the entries actually written. Entries whose names would escape
/// `destination` are skipped with a warning. Any failure names the path it
/// happened on; nothing already written is rolled back.
///
/// Directory modes are applied after every entry is written, deepest first,
/// so a read-only directory still receives its children.
pub fn extract_zip(archive_path: &Path, destination: &Path) -> Result<ArchiveTree> {
    let file = File::open(archive_path).map_err(|e| InstallError::extraction(archive_path, "cannot open archive", e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| InstallError::extraction(archive_path, "not a readable zip archive", e))?;

    fs::create_dir_all(destination)
        .map_err(|e| InstallError::extraction(destination, "cannot create extraction directory", e))?;

    let mut written = Vec::with_capacity(archive.len());
    let mut dir_modes = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| InstallError::extraction(archive_path, format!("cannot read entry {}", i), e))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry '{}'", entry.name());
            continue;
        };
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| InstallError::extraction(&out_path, "cannot create directory", e))?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| InstallError::extraction(parent, "cannot create directory", e))?;
            }
            let mut out_file =
                File::create(&out_path).map_err(|e| InstallError::extraction(&out_path, "cannot create file", e))?;
            io::copy(&mut entry, &mut out_file)
                .map_err(|e| InstallError::extraction(&out_path, "cannot write file", e))?;
        }

        if let Some(mode) = entry.unix_mode() {
            if entry.is_dir() {
                dir_modes.push((out_path.clone(), mode));
            } else {
                set_mode(&out_path, mode)?;
            }
        }

        written.push(ArchiveEntry {
            path: relative,
            is_dir: entry.is_dir(),
        });
    }

    dir_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (path, mode) in &dir_modes {
        set_mode(path, *mode)?;
    }

    debug!(
        "Extracted {} entries from {} to {}",
        written.len(),
        archive_path.display(),
        destination.display()
    );
    Ok(ArchiveTree::new(written))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| InstallError::extraction(path, "cannot set permissions", e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
