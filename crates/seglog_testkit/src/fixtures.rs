//! Test fixtures and WAL helpers.
//!
//! Provides convenience wrappers for setting up WAL instances backed by
//! temporary directories with automatic cleanup.

use seglog_core::{Config, Wal};
use std::path::PathBuf;
use tempfile::TempDir;

/// A test WAL with automatic cleanup.
pub struct TestWal {
    /// The WAL instance.
    pub wal: Wal,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestWal {
    /// Creates a WAL in a fresh temporary directory.
    pub fn open(max_kb: u32) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let wal = Wal::open(temp_dir.path(), max_kb).expect("Failed to open WAL");
        Self {
            wal,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a WAL with explicit configuration.
    pub fn open_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let wal =
            Wal::open_with_config(temp_dir.path(), config).expect("Failed to open WAL");
        Self {
            wal,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the path of a segment file inside the data directory.
    pub fn segment_path(&self, segment_no: u32) -> PathBuf {
        self._temp_dir
            .path()
            .join(format!("wal@{segment_no}.db"))
    }

    /// Closes the WAL and reopens it over the same directory, as after a
    /// process restart.
    pub fn reopen(self, max_kb: u32) -> Self {
        let Self { wal, _temp_dir } = self;
        wal.close().expect("Failed to close WAL");
        drop(wal);

        let wal = Wal::open(_temp_dir.path(), max_kb).expect("Failed to reopen WAL");
        Self { wal, _temp_dir }
    }
}

impl std::ops::Deref for TestWal {
    type Target = Wal;

    fn deref(&self) -> &Self::Target {
        &self.wal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_round_trip() {
        let wal = TestWal::open(1024);
        wal.write(b"fixture data").unwrap();
        wal.sync().unwrap();
        assert_eq!(wal.read().unwrap(), vec![b"fixture data".to_vec()]);
    }

    #[test]
    fn reopen_preserves_contents() {
        let wal = TestWal::open(1024);
        wal.write(b"persistent").unwrap();
        wal.sync().unwrap();

        let wal = wal.reopen(1024);
        assert_eq!(wal.read().unwrap(), vec![b"persistent".to_vec()]);
        assert_eq!(wal.last_sequence(), 1);
    }

    #[test]
    fn custom_config_fixture() {
        let config = Config::default()
            .max_log_size(512)
            .sync_interval(std::time::Duration::from_secs(3600));
        let wal = TestWal::open_with_config(config);

        wal.write(b"configured").unwrap();
        wal.sync().unwrap();
        assert_eq!(wal.read().unwrap(), vec![b"configured".to_vec()]);
    }

    #[test]
    fn segment_path_matches_layout() {
        let wal = TestWal::open(1024);
        wal.write(b"x").unwrap();
        wal.sync().unwrap();
        assert!(wal.segment_path(1).exists());
    }
}
