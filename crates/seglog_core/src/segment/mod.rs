//! Segment files.
//!
//! A segment is one on-disk file holding a sequence of framed records in
//! write order. The writer owns a single append-mode handle on the
//! current segment; readers open their own read-only handles on demand.

mod reader;

pub use reader::{SegmentReader, ValidPrefix};

use crate::dir::WalDir;
use crate::error::WalResult;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// One physical segment file, identified by its number.
#[derive(Debug, Clone)]
pub struct Segment {
    number: u32,
    path: PathBuf,
}

impl Segment {
    /// Creates a handle for segment `number` inside `dir`.
    #[must_use]
    pub fn new(dir: &WalDir, number: u32) -> Self {
        Self {
            number,
            path: dir.segment_path(number),
        }
    }

    /// Returns the segment number.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the path to the segment file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the segment for appending, creating it if missing.
    pub fn open_append(&self) -> WalResult<File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?)
    }

    /// Opens an independent read-only handle on the segment.
    pub fn open_read(&self) -> WalResult<File> {
        Ok(File::open(&self.path)?)
    }

    /// Returns the on-disk size of the segment.
    ///
    /// This reflects flushed bytes only; bytes still sitting in the
    /// writer's buffer are not counted.
    pub fn size(&self) -> WalResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}
