//! Entry list of an extracted archive

use std::collections::BTreeSet;
use std::path::PathBuf;

/// One entry of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the archive root
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Entry list of an archive, in archive order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveTree {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveTree {
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct first path components, sorted
    pub fn top_level_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .entries
            .iter()
            .filter_map(first_component)
            .collect();
        names.into_iter().collect()
    }

    /// Top-level names that are directories, sorted.
    ///
    /// A directory counts whether the archive lists it explicitly or only
    /// through entries nested below it.
    pub fn top_level_dirs(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .entries
            .iter()
            .filter(|e| e.is_dir || e.path.components().count() > 1)
            .filter_map(first_component)
            .collect();
        names.into_iter().collect()
    }
}

fn first_component(entry: &ArchiveEntry) -> Option<String> {
    entry
        .path
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
}
