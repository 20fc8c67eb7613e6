//! # seglog Testkit
//!
//! Test utilities for the segmented WAL.
//!
//! This crate provides:
//! - Test fixtures with automatic cleanup
//! - Corruption-injection helpers and recovery harnesses
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use seglog_testkit::prelude::*;
//!
//! let wal = TestWal::open(1024);
//! wal.write(b"payload").unwrap();
//! wal.sync().unwrap();
//! assert_eq!(wal.read().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod corruption;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::corruption::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use corruption::*;
pub use fixtures::*;
pub use generators::*;
