//! Error types for the segmented log.

use std::io;
use thiserror::Error;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors that can occur in WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record document encoding failed.
    #[error("record encoding failed: {0}")]
    Codec(#[from] serde_json::Error),

    /// A record decoded but its checksum did not match.
    #[error(
        "checksum mismatch in segment {segment} for record {seq}: \
         expected {expected:08x}, got {actual:08x}"
    )]
    ChecksumMismatch {
        /// Segment the record was read from.
        segment: u32,
        /// Sequence number claimed by the record.
        seq: i32,
        /// Checksum stored on disk.
        expected: u32,
        /// Checksum recomputed from the record contents.
        actual: u32,
    },

    /// A frame could not be read: short header, short payload, or an
    /// undecodable record body.
    #[error("truncated frame in segment {segment} at offset {offset}: {message}")]
    TruncatedFrame {
        /// Segment the frame was read from.
        segment: u32,
        /// Byte offset of the frame start.
        offset: u64,
        /// Description of the failure.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },

    /// The WAL has been closed.
    #[error("wal is closed")]
    Closed,
}

impl WalError {
    /// Creates a truncated frame error.
    pub fn truncated_frame(segment: u32, offset: u64, message: impl Into<String>) -> Self {
        Self::TruncatedFrame {
            segment,
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if this error marks on-disk damage that `repair`
    /// can truncate away (checksum mismatch or torn frame).
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::TruncatedFrame { .. }
        )
    }
}
