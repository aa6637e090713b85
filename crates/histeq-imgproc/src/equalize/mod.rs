use histeq_image::{Image, ImageError};

use crate::comm::CommError;
use crate::histogram::Histogram;
use crate::lut::{EmptyHistogramError, EqualizationMap};
use crate::parallel::{ExecutionStrategy, ParallelError};

/// Message passing equalizer where every rank owns one block of rows.
pub mod distributed;

/// Thread pool equalizer where workers share the image.
pub mod shared;

/// Single-threaded reference equalizer.
pub mod sequential;

pub use distributed::DistributedEqualizer;
pub use sequential::SequentialEqualizer;
pub use shared::SharedMemoryEqualizer;

/// Errors that can occur while equalizing an image.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EqualizeError {
    /// The image has no pixels, so its histogram cannot be normalised.
    #[error("cannot equalize an empty image ({0}x{1})")]
    EmptyImage(usize, usize),

    /// Error from the image buffer.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the worker pool.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Error from the message passing layer.
    #[error(transparent)]
    Comm(#[from] CommError),

    /// Error while deriving the lookup table.
    #[error(transparent)]
    EmptyHistogram(#[from] EmptyHistogramError),

    /// A gathered block does not have the size its partition promised.
    #[error("rank {rank} returned {got} samples, expected {expected}")]
    BlockSizeMismatch {
        /// the rank the block came from.
        rank: usize,
        /// samples expected from the partition.
        expected: usize,
        /// samples received.
        got: usize,
    },
}

/// The result of a successful equalization.
#[derive(Clone, Debug, PartialEq)]
pub struct EqualizeOutput {
    /// The equalized image.
    pub image: Image<u8, 1>,
    /// Histogram of the input image.
    pub hist_before: Histogram,
    /// Histogram of the equalized image.
    pub hist_after: Histogram,
}

/// A strategy to equalize the histogram of a gray image.
///
/// Every implementation returns bit-identical results for the same input.
pub trait Equalizer {
    /// Equalize `image` and return it with its histograms before and after.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or the strategy fails to coordinate its workers.
    /// No partial result is returned on error.
    fn equalize(&self, image: Image<u8, 1>) -> Result<EqualizeOutput, EqualizeError>;
}

/// Equalize the histogram of `image` with the given strategy.
///
/// # Example
///
/// ```
/// use histeq_image::{Image, ImageSize};
/// use histeq_imgproc::equalize::equalize_histogram;
/// use histeq_imgproc::parallel::ExecutionStrategy;
///
/// let image = Image::<u8, 1>::new(
///     ImageSize { width: 2, height: 2 },
///     vec![0, 85, 170, 255],
/// ).unwrap();
///
/// let out = equalize_histogram(image, ExecutionStrategy::Fixed(2)).unwrap();
/// assert_eq!(out.image.as_slice(), &[64, 128, 191, 255]);
/// assert_eq!(out.hist_after[191], 1);
/// ```
pub fn equalize_histogram(
    image: Image<u8, 1>,
    strategy: ExecutionStrategy,
) -> Result<EqualizeOutput, EqualizeError> {
    match strategy {
        ExecutionStrategy::Serial => SequentialEqualizer.equalize(image),
        ExecutionStrategy::Fixed(n) => SharedMemoryEqualizer::new(n).equalize(image),
        ExecutionStrategy::Distributed(n) => DistributedEqualizer::new(n).equalize(image),
    }
}

pub(crate) fn ensure_not_empty(image: &Image<u8, 1>) -> Result<(), EqualizeError> {
    if image.is_empty() {
        return Err(EqualizeError::EmptyImage(image.cols(), image.rows()));
    }
    Ok(())
}

pub(crate) fn derive_map(
    hist: &Histogram,
    total_pixels: usize,
) -> Result<EqualizationMap, EqualizeError> {
    let map = EqualizationMap::from_histogram(hist, total_pixels)?;
    log::debug!(
        "derived lut from {} pixels, lut[0]={} lut[255]={}",
        total_pixels,
        map.lut.0[0],
        map.lut.0[255]
    );
    Ok(map)
}
