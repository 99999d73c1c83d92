//! Normalizes a downloaded archive into the install directory layout

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::extract::extract_zip;
use super::has_archive_extension;
use super::tree::ArchiveTree;
use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};
use crate::install_dir::{ClearReport, InstallDirectory};

/// Which part of the download became the installed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The outer archive's own contents
    Flat,
    /// A nested archive found inside the outer one, relative to its root
    Nested { archive: PathBuf },
}

/// What [`ArchiveNormalizer::normalize`] did
#[derive(Debug)]
pub struct NormalizeOutcome {
    pub payload: Payload,
    /// Name of the wrapper folder whose contents were promoted, if any
    pub flattened: Option<String>,
    /// Entries the pre-install clear could not remove
    pub clear_report: ClearReport,
    /// Entries written by the extraction that produced the payload
    pub entries_extracted: usize,
}

/// Turns an arbitrary downloaded archive into the intended layout
#[derive(Debug, Clone)]
pub struct ArchiveNormalizer {
    build_target: String,
    archive_extension: String,
}

impl ArchiveNormalizer {
    pub fn new<S: Into<String>>(build_target: S, archive_extension: S) -> Self {
        Self {
            build_target: build_target.into(),
            archive_extension: archive_extension.into(),
        }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(config.build_target.clone(), config.archive_extension.clone())
    }

    /// Unpack `archive` into `target`, replacing whatever was there.
    ///
    /// 1. Extract the outer archive into a scratch directory.
    /// 2. Clear the target, then install either the first nested archive
    ///    found in scratch (extracted straight into the target) or the
    ///    scratch contents themselves.
    /// 3. Promote the contents of a single build-named wrapper folder.
    ///
    /// The target is only touched once the outer archive extracted cleanly.
    /// A failure after that leaves the target partially written.
    pub fn normalize(&self, archive: &Path, target: &InstallDirectory) -> Result<NormalizeOutcome> {
        let scratch = scratch_dir_for(target.path())?;
        let outer = extract_zip(archive, scratch.path())?;
        debug!(
            "Outer archive holds {} entries under {:?}",
            outer.len(),
            outer.top_level_names()
        );

        let nested = self.find_nested_archive(scratch.path());

        let clear_report = target.ensure_cleared();
        target.ensure_exists()?;

        let (payload, installed) = match nested {
            Some(inner) => {
                let relative = inner.strip_prefix(scratch.path()).unwrap_or(&inner).to_path_buf();
                info!("Installing nested archive {}", relative.display());
                let tree = extract_zip(&inner, target.path())?;
                (Payload::Nested { archive: relative }, tree)
            }
            None => {
                let entries = InstallDirectory::new(scratch.path()).top_level_entries()?;
                for entry in &entries {
                    target.commit_entry(entry)?;
                }
                info!("Moved {} extracted entries into place", entries.len());
                (Payload::Flat, outer)
            }
        };

        drop(scratch);

        let flattened = self.flatten_wrapped_build(&installed, target)?;

        Ok(NormalizeOutcome {
            payload,
            flattened,
            clear_report,
            entries_extracted: installed.len(),
        })
    }

    /// First archive file under `root`, walking depth-first with siblings
    /// sorted by name. With several candidates the first one wins; that is
    /// a policy, not a guess at the right one.
    pub fn find_nested_archive(&self, root: &Path) -> Option<PathBuf> {
        let mut candidates = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry while scanning {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| has_archive_extension(&entry.file_name().to_string_lossy(), &self.archive_extension))
            .map(|entry| entry.into_path());

        let first = candidates.next();
        if first.is_some() && candidates.next().is_some() {
            warn!("Archive contains several nested archives, using the first in name order");
        }
        first
    }

    /// If exactly one top-level directory of the installed payload carries
    /// the build target in its name, move its contents up and remove it.
    ///
    /// Only directories listed in `installed` are candidates. Leftovers the
    /// pre-install clear could not remove never count.
    pub fn flatten_wrapped_build(&self, installed: &ArchiveTree, target: &InstallDirectory) -> Result<Option<String>> {
        let wrappers: Vec<String> = installed
            .top_level_dirs()
            .into_iter()
            .filter(|name| name.contains(&self.build_target))
            .collect();

        match wrappers.as_slice() {
            [] => Ok(None),
            [name] => {
                let wrapper = target.path().join(name);
                if !wrapper.is_dir() {
                    warn!("Wrapped build folder {} is missing from {}", name, target.path().display());
                    return Ok(None);
                }
                let promoted = target.promote_children(&wrapper)?;
                info!("Flattened wrapped build folder {} ({} entries)", name, promoted);
                Ok(Some(name.clone()))
            }
            several => {
                warn!(
                    "{} top-level folders match '{}', leaving layout as is",
                    several.len(),
                    self.build_target
                );
                Ok(None)
            }
        }
    }
}

/// Scratch directory next to the target, so moves stay on one filesystem
fn scratch_dir_for(target: &Path) -> Result<tempfile::TempDir> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);

    std::fs::create_dir_all(&parent)
        .map_err(|e| InstallError::extraction(&parent, "cannot create scratch parent", e))?;

    tempfile::Builder::new()
        .prefix(".install-scratch-")
        .tempdir_in(&parent)
        .map_err(|e| InstallError::extraction(&parent, "cannot create scratch directory", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::{write_zip, zip_bytes};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn normalizer() -> ArchiveNormalizer {
        ArchiveNormalizer::new("windows-msvc", ".zip")
    }

    /// Relative path -> content for every file under `root`
    fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    fn top_level(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_flat_archive_files_land_at_top_level() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("flat.zip");
        write_zip(
            &archive,
            &[("a.txt", Some(b"a")), ("b.txt", Some(b"b")), ("c.dll", Some(b"c"))],
        );
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(outcome.payload, Payload::Flat);
        assert_eq!(outcome.flattened, None);
        assert_eq!(top_level(target.path()), vec!["a.txt", "b.txt", "c.dll"]);
    }

    #[test]
    fn test_nested_archive_replaces_outer_contents() {
        let temp = tempdir().unwrap();
        let inner = zip_bytes(&[("app.exe", Some(b"exe")), ("data/cfg.ini", Some(b"ini"))]);
        let archive = temp.path().join("outer.zip");
        write_zip(
            &archive,
            &[("notes.txt", Some(b"outer only")), ("payload/release.zip", Some(inner.as_slice()))],
        );
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(
            outcome.payload,
            Payload::Nested {
                archive: PathBuf::from("payload").join("release.zip")
            }
        );
        let files = snapshot(target.path());
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["app.exe", "data/cfg.ini"]);
        assert!(!target.path().join("notes.txt").exists());
    }

    #[test]
    fn test_multiple_nested_archives_first_in_name_order_wins() {
        let temp = tempdir().unwrap();
        let first = zip_bytes(&[("from-a.txt", Some(b"a"))]);
        let second = zip_bytes(&[("from-b.txt", Some(b"b"))]);
        let archive = temp.path().join("outer.zip");
        write_zip(&archive, &[("b.zip", Some(second.as_slice())), ("a.zip", Some(first.as_slice()))]);
        let target = InstallDirectory::new(temp.path().join("install"));

        normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(top_level(target.path()), vec!["from-a.txt"]);
    }

    #[test]
    fn test_wrapped_build_folder_is_promoted() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("app-windows-msvc.zip");
        write_zip(
            &archive,
            &[
                ("app-windows-msvc/bin/app.exe", Some(b"exe")),
                ("app-windows-msvc/readme.txt", Some(b"readme")),
            ],
        );
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(outcome.flattened.as_deref(), Some("app-windows-msvc"));
        assert_eq!(top_level(target.path()), vec!["bin", "readme.txt"]);
        assert_eq!(fs::read(target.path().join("bin/app.exe")).unwrap(), b"exe");
    }

    #[test]
    fn test_nested_archive_with_wrapped_folder() {
        let temp = tempdir().unwrap();
        let inner = zip_bytes(&[("lemonade-windows-msvc/lemonade-qt.exe", Some(b"qt"))]);
        let archive = temp.path().join("windows-msvc.zip");
        write_zip(&archive, &[("lemonade-windows-msvc.zip", Some(inner.as_slice()))]);
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert!(matches!(outcome.payload, Payload::Nested { .. }));
        assert_eq!(outcome.flattened.as_deref(), Some("lemonade-windows-msvc"));
        assert_eq!(top_level(target.path()), vec!["lemonade-qt.exe"]);
    }

    #[test]
    fn test_ambiguous_wrappers_are_left_alone() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("two.zip");
        write_zip(
            &archive,
            &[
                ("app-windows-msvc/a.txt", Some(b"a")),
                ("app-windows-msvc-debug/b.txt", Some(b"b")),
            ],
        );
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(outcome.flattened, None);
        assert_eq!(top_level(target.path()), vec!["app-windows-msvc", "app-windows-msvc-debug"]);
    }

    #[test]
    fn test_leftover_folder_does_not_block_flatten() {
        let temp = tempdir().unwrap();
        let target = InstallDirectory::new(temp.path().join("install"));
        // A previous build folder that survived the clear, next to the new payload
        fs::create_dir_all(target.path().join("old-windows-msvc")).unwrap();
        fs::write(target.path().join("old-windows-msvc/locked.dll"), b"old").unwrap();
        fs::create_dir_all(target.path().join("app-windows-msvc/bin")).unwrap();
        fs::write(target.path().join("app-windows-msvc/bin/app.exe"), b"exe").unwrap();
        let installed = ArchiveTree::new(vec![crate::archive::tree::ArchiveEntry {
            path: PathBuf::from("app-windows-msvc/bin/app.exe"),
            is_dir: false,
        }]);

        let flattened = normalizer().flatten_wrapped_build(&installed, &target).unwrap();

        assert_eq!(flattened.as_deref(), Some("app-windows-msvc"));
        assert_eq!(top_level(target.path()), vec!["bin", "old-windows-msvc"]);
    }

    #[test]
    fn test_non_matching_single_folder_is_kept() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("docs.zip");
        write_zip(&archive, &[("docs/index.html", Some(b"<html>"))]);
        let target = InstallDirectory::new(temp.path().join("install"));

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(outcome.flattened, None);
        assert_eq!(top_level(target.path()), vec!["docs"]);
    }

    #[test]
    fn test_empty_archive_leaves_empty_target() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("empty.zip");
        write_zip(&archive, &[]);
        let target = InstallDirectory::new(temp.path().join("install"));
        fs::create_dir_all(target.path()).unwrap();
        fs::write(target.path().join("previous.exe"), b"old").unwrap();

        let outcome = normalizer().normalize(&archive, &target).unwrap();

        assert_eq!(outcome.entries_extracted, 0);
        assert!(target.path().is_dir());
        assert!(top_level(target.path()).is_empty());
    }

    #[test]
    fn test_reinstall_removes_files_only_in_old_version() {
        let temp = tempdir().unwrap();
        let target = InstallDirectory::new(temp.path().join("install"));

        let v1 = temp.path().join("v1.zip");
        write_zip(&v1, &[("app.exe", Some(b"v1")), ("legacy.dll", Some(b"old"))]);
        normalizer().normalize(&v1, &target).unwrap();
        assert!(target.path().join("legacy.dll").exists());

        let v2 = temp.path().join("v2.zip");
        write_zip(&v2, &[("app.exe", Some(b"v2")), ("new.dll", Some(b"new"))]);
        let outcome = normalizer().normalize(&v2, &target).unwrap();

        assert_eq!(outcome.clear_report.removed, 2);
        assert_eq!(top_level(target.path()), vec!["app.exe", "new.dll"]);
        assert_eq!(fs::read(target.path().join("app.exe")).unwrap(), b"v2");
    }

    #[test]
    fn test_normalize_twice_is_identical() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("app-windows-msvc.zip");
        write_zip(
            &archive,
            &[
                ("app-windows-msvc/bin/app.exe", Some(b"exe")),
                ("app-windows-msvc/share/icons/app.png", Some(b"png")),
                ("app-windows-msvc/readme.txt", Some(b"readme")),
            ],
        );
        let target = InstallDirectory::new(temp.path().join("install"));

        normalizer().normalize(&archive, &target).unwrap();
        let first = snapshot(target.path());
        normalizer().normalize(&archive, &target).unwrap();
        let second = snapshot(target.path());

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_corrupt_archive_leaves_target_untouched() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"not a zip at all").unwrap();
        let target = InstallDirectory::new(temp.path().join("install"));
        fs::create_dir_all(target.path()).unwrap();
        fs::write(target.path().join("app.exe"), b"installed").unwrap();

        let err = normalizer().normalize(&archive, &target).unwrap_err();

        assert!(matches!(err, InstallError::ExtractionFailed { .. }));
        assert_eq!(fs::read(target.path().join("app.exe")).unwrap(), b"installed");
    }

    #[test]
    fn test_scratch_directory_is_removed() {
        let temp = tempdir().unwrap();
        let archive = temp.path().join("flat.zip");
        write_zip(&archive, &[("a.txt", Some(b"a"))]);
        let target = InstallDirectory::new(temp.path().join("install"));

        normalizer().normalize(&archive, &target).unwrap();

        let leftovers: Vec<_> = top_level(temp.path())
            .into_iter()
            .filter(|n| n.starts_with(".install-scratch-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
