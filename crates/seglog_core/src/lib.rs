//! # seglog
//!
//! A single-writer, append-only, crash-recoverable write-ahead log over
//! a directory of numbered segment files.
//!
//! This crate provides:
//! - Framed, checksummed records with monotonic sequence numbers
//! - Buffered writes with size-based segment rotation
//! - A background flush scheduler
//! - Recovery reads: whole segment, tail from a segment, tail from the
//!   last checkpoint
//! - Truncation-style repair of torn or corrupt segment tails
//!
//! ## Quick start
//!
//! ```no_run
//! use seglog_core::Wal;
//! use std::path::Path;
//!
//! # fn main() -> seglog_core::WalResult<()> {
//! let wal = Wal::open(Path::new("data"), 2)?;
//!
//! for i in 0..100 {
//!     wal.write(format!("hello - {i}").as_bytes())?;
//! }
//! wal.sync()?;
//!
//! for payload in wal.read_from_segment(1)? {
//!     println!("{}", String::from_utf8_lossy(&payload));
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dir;
pub mod error;
pub mod record;
pub mod segment;
pub mod wal;

pub use config::Config;
pub use dir::WalDir;
pub use error::{WalError, WalResult};
pub use record::Record;
pub use segment::{Segment, SegmentReader};
pub use wal::Wal;
