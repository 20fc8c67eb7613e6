//! Data directory management.
//!
//! A WAL directory holds one file per segment:
//!
//! ```text
//! <dir>/
//! ├─ wal@1.db
//! ├─ wal@2.db
//! └─ ...
//! ```
//!
//! Segment numbers are dense positive integers starting at 1. Files that
//! do not match the `wal@<n>.db` pattern are ignored.

use crate::error::{WalError, WalResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Segment file name parts: `wal@<n>.db`.
const FILE_PREFIX: &str = "wal";
const FILE_EXT: &str = "db";
/// Suffix for the scratch file used during atomic segment replacement.
const TMP_SUFFIX: &str = "tmp";

/// Manages the WAL data directory: naming, listing, and atomic
/// replacement of segment files.
#[derive(Debug, Clone)]
pub struct WalDir {
    /// Root directory path.
    path: PathBuf,
}

impl WalDir {
    /// Opens or creates a WAL data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> WalResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(WalError::invalid_argument(format!(
                    "data directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(WalError::invalid_argument(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Returns the path to the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to a segment file, e.g. `wal@3.db`.
    #[must_use]
    pub fn segment_path(&self, segment_no: u32) -> PathBuf {
        self.path
            .join(format!("{FILE_PREFIX}@{segment_no}.{FILE_EXT}"))
    }

    /// Parses a segment number out of a file name.
    ///
    /// Returns `None` for anything that is not `wal@<n>.db` with `n ≥ 1`.
    #[must_use]
    pub fn parse_segment_number(file_name: &str) -> Option<u32> {
        let rest = file_name.strip_prefix(FILE_PREFIX)?.strip_prefix('@')?;
        let digits = rest.strip_suffix(FILE_EXT)?.strip_suffix('.')?;
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 => Some(n),
            _ => None,
        }
    }

    /// Lists the segment numbers present in the directory, sorted.
    ///
    /// Files that don't follow the segment naming pattern are skipped.
    pub fn list_segments(&self) -> WalResult<Vec<u32>> {
        let mut segments = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            match Self::parse_segment_number(name) {
                Some(n) => segments.push(n),
                None => {
                    debug!(file = name, "skipping non-segment file in data directory");
                }
            }
        }

        segments.sort_unstable();
        Ok(segments)
    }

    /// Returns the highest segment number present, if any.
    pub fn max_segment(&self) -> WalResult<Option<u32>> {
        Ok(self.list_segments()?.into_iter().max())
    }

    /// Atomically replaces a segment file with the given contents.
    ///
    /// Uses write-then-rename for crash safety:
    /// 1. Write to `wal@<n>.db.tmp`
    /// 2. Sync the temporary file to disk
    /// 3. Rename onto `wal@<n>.db`
    /// 4. Fsync the directory so the rename is durable
    pub fn replace_segment(&self, segment_no: u32, contents: &[u8]) -> WalResult<()> {
        let segment_path = self.segment_path(segment_no);
        let temp_path = segment_path.with_extension(format!("{FILE_EXT}.{TMP_SUFFIX}"));

        let mut file = File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &segment_path)?;
        self.sync_directory()?;

        Ok(())
    }

    /// Syncs the data directory so file creations and renames are durable.
    ///
    /// On Windows, directory fsync is not supported in the same way as
    /// Unix; the NTFS journal provides the metadata durability guarantee.
    #[cfg(unix)]
    fn sync_directory(&self) -> WalResult<()> {
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> WalResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let data_path = temp.path().join("new_wal");

        assert!(!data_path.exists());

        let dir = WalDir::open(&data_path, true).unwrap();
        assert!(data_path.is_dir());
        assert_eq!(dir.path(), data_path);
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let data_path = temp.path().join("nonexistent");

        let result = WalDir::open(&data_path, false);
        assert!(matches!(result, Err(WalError::InvalidArgument { .. })));
    }

    #[test]
    fn segment_paths_are_correct() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        assert_eq!(dir.segment_path(1), temp.path().join("wal@1.db"));
        assert_eq!(dir.segment_path(42), temp.path().join("wal@42.db"));
    }

    #[test]
    fn parse_accepts_segment_names() {
        assert_eq!(WalDir::parse_segment_number("wal@1.db"), Some(1));
        assert_eq!(WalDir::parse_segment_number("wal@120.db"), Some(120));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert_eq!(WalDir::parse_segment_number("wal@0.db"), None);
        assert_eq!(WalDir::parse_segment_number("wal@-1.db"), None);
        assert_eq!(WalDir::parse_segment_number("wal@x.db"), None);
        assert_eq!(WalDir::parse_segment_number("wal@1.tmp"), None);
        assert_eq!(WalDir::parse_segment_number("wal@1.db.tmp"), None);
        assert_eq!(WalDir::parse_segment_number("journal@1.db"), None);
        assert_eq!(WalDir::parse_segment_number("LOCK"), None);
        assert_eq!(WalDir::parse_segment_number("wal@.db"), None);
    }

    #[test]
    fn list_skips_foreign_files() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        fs::write(dir.segment_path(2), b"").unwrap();
        fs::write(dir.segment_path(1), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(temp.path().join("wal@9.db.d")).unwrap();

        assert_eq!(dir.list_segments().unwrap(), vec![1, 2]);
        assert_eq!(dir.max_segment().unwrap(), Some(2));
    }

    #[test]
    fn max_segment_empty_directory() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();
        assert_eq!(dir.max_segment().unwrap(), None);
    }

    #[test]
    fn replace_segment_swaps_contents() {
        let temp = tempdir().unwrap();
        let dir = WalDir::open(temp.path(), true).unwrap();

        fs::write(dir.segment_path(1), b"old contents").unwrap();
        dir.replace_segment(1, b"new").unwrap();

        assert_eq!(fs::read(dir.segment_path(1)).unwrap(), b"new");
        // No scratch file left behind.
        assert_eq!(dir.list_segments().unwrap(), vec![1]);
        assert!(!temp.path().join("wal@1.db.tmp").exists());
    }
}
