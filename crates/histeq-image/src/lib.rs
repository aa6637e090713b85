#![deny(missing_docs)]
//! Image buffer and row partitioning for histogram equalization

/// image representation for histogram equalization.
pub mod image;

/// Error types for the image module.
pub mod error;

/// contiguous row partitioning shared by every parallel strategy.
pub mod partition;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::partition::{partition_rows, RowPartition};
