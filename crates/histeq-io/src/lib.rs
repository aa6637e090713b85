#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access and encoding/decoding failures.
pub mod error;

/// High-level image reading and writing functions.
///
/// See [`functional::read_image_any_gray8`] for automatic format detection.
pub mod functional;

/// Wall-clock timing of a run and a CSV log of past runs.
pub mod runtime;

pub use crate::error::IoError;
