//! WAL configuration.

use std::time::Duration;

/// Configuration for opening a WAL.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Maximum size of a single segment file before rotation, in bytes.
    ///
    /// The size check runs against the flushed (on-disk) size, so a
    /// segment may exceed this by up to one buffered frame.
    pub max_log_size: u64,

    /// How often the background scheduler flushes the write buffer
    /// to the operating system.
    pub sync_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_log_size: 64 * 1024 * 1024, // 64 MB
            sync_interval: Duration::from_millis(100),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the maximum segment size in bytes.
    #[must_use]
    pub const fn max_log_size(mut self, size: u64) -> Self {
        self.max_log_size = size;
        self
    }

    /// Sets the background flush interval.
    #[must_use]
    pub const fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }
}
