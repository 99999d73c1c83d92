//! Archive normalization
//!
//! Upstream artifacts come in several shapes: a flat archive of files, an
//! archive wrapping exactly one nested archive, or an archive whose payload
//! sits under a single build-named folder. [`ArchiveNormalizer`] turns any
//! of them into the same flat layout at the install directory.

pub mod extract;
pub mod normalize;
pub mod tree;

pub use extract::extract_zip;
pub use normalize::{ArchiveNormalizer, NormalizeOutcome, Payload};
pub use tree::{ArchiveEntry, ArchiveTree};

/// Case-insensitive check of `name` against an extension such as `.zip`
pub fn has_archive_extension(name: &str, extension: &str) -> bool {
    name.len() > extension.len() && name.to_ascii_lowercase().ends_with(&extension.to_ascii_lowercase())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builds zip fixtures in memory

    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// An entry of a fixture archive; `None` content marks a directory
    pub type Entry<'a> = (&'a str, Option<&'a [u8]>);

    pub fn zip_bytes(entries: &[Entry<'_>]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, content) in entries {
            match content {
                Some(bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                None => {
                    writer.add_directory(*name, options).unwrap();
                }
            }
        }

        writer.finish().unwrap().into_inner()
    }

    pub fn write_zip(path: &std::path::Path, entries: &[Entry<'_>]) {
        std::fs::write(path, zip_bytes(entries)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_archive_extension() {
        assert!(has_archive_extension("payload.zip", ".zip"));
        assert!(has_archive_extension("PAYLOAD.ZIP", ".zip"));
        assert!(!has_archive_extension(".zip", ".zip"));
        assert!(!has_archive_extension("payload.zip.txt", ".zip"));
        assert!(!has_archive_extension("zip", ".zip"));
    }
}
