/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the pixel coordinates are out of bounds.
    #[error("Pixel coordinates ({0}, {1}) are out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the row interval does not fit in the image.
    #[error("Row range [{start}, {end}) is invalid for an image with {rows} rows")]
    InvalidRowRange {
        /// first row of the interval.
        start: usize,
        /// one past the last row of the interval.
        end: usize,
        /// number of rows of the image.
        rows: usize,
    },

    /// Error when asking for zero partitions.
    #[error("Number of partitions must be > 0, got {0}")]
    InvalidPartitionCount(usize),

    /// Error when a set of partitions does not tile the image rows.
    #[error("Partitions do not cover the {0} image rows exactly once")]
    PartitionMismatch(usize),
}
