use std::ops::Index;
use std::sync::Mutex;

use histeq_image::{Image, ImageError};

use crate::parallel::ParallelError;

/// Number of bins of an 8-bit intensity histogram.
pub const NUM_BINS: usize = 256;

/// Pixel intensity frequencies of an 8-bit image region.
///
/// The bin index is the intensity, so `hist[v]` is the number of samples equal to `v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Histogram([usize; NUM_BINS]);

impl Default for Histogram {
    fn default() -> Self {
        Self([0; NUM_BINS])
    }
}

impl Histogram {
    /// Create an all-zero histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the samples of a raw pixel slice.
    ///
    /// # Example
    ///
    /// ```
    /// use histeq_imgproc::histogram::Histogram;
    ///
    /// let hist = Histogram::from_pixels(&[0, 0, 7, 255]);
    /// assert_eq!(hist[0], 2);
    /// assert_eq!(hist[7], 1);
    /// assert_eq!(hist.total(), 4);
    /// ```
    pub fn from_pixels(pixels: &[u8]) -> Self {
        let mut hist = Self::default();
        hist.accumulate(pixels);
        hist
    }

    /// Add the samples of `pixels` to the counts.
    pub fn accumulate(&mut self, pixels: &[u8]) {
        for &px in pixels {
            self.0[px as usize] += 1;
        }
    }

    /// Add every bin of `other` into `self`.
    pub fn merge(&mut self, other: &Histogram) {
        self.0
            .iter_mut()
            .zip(other.0.iter())
            .for_each(|(a, b)| *a += b);
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Largest bin count.
    pub fn max_count(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// The counts as a slice of `NUM_BINS` elements.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Index<usize> for Histogram {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<[usize; NUM_BINS]> for Histogram {
    fn from(bins: [usize; NUM_BINS]) -> Self {
        Self(bins)
    }
}

impl std::iter::Sum for Histogram {
    fn sum<I: Iterator<Item = Histogram>>(iter: I) -> Self {
        iter.fold(Histogram::default(), |mut acc, h| {
            acc.merge(&h);
            acc
        })
    }
}

/// Compute the pixel intensity histogram of a whole image.
///
/// NOTE: this is limited to 8-bit 1-channel images.
///
/// # Example
///
/// ```
/// use histeq_image::{Image, ImageSize};
/// use histeq_imgproc::histogram::compute_histogram;
///
/// let image = Image::<u8, 1>::new(
///   ImageSize {
///     width: 3,
///     height: 3,
///   },
///   vec![0, 2, 4, 128, 130, 132, 254, 255, 255],
/// ).unwrap();
///
/// let histogram = compute_histogram(&image);
/// assert_eq!(histogram[255], 2);
/// assert_eq!(histogram.total(), 9);
/// ```
pub fn compute_histogram(src: &Image<u8, 1>) -> Histogram {
    Histogram::from_pixels(src.as_slice())
}

/// Compute the histogram of the rows `[start_row, end_row)` over all columns.
///
/// An empty interval gives an all-zero histogram.
///
/// # Errors
///
/// Returns an error if the interval does not lie inside the image.
pub fn compute_histogram_rows(
    src: &Image<u8, 1>,
    start_row: usize,
    end_row: usize,
) -> Result<Histogram, ImageError> {
    let rows = src.rows_slice(start_row, end_row)?;
    Ok(Histogram::from_pixels(rows))
}

/// A histogram that many workers can merge their private counts into.
///
/// Each call to [`HistogramAccumulator::merge`] adds all bins of one contribution while holding
/// the lock, so contributions never interleave bin by bin. Integer addition commutes, so the final
/// counts do not depend on the order in which workers merge.
#[derive(Debug, Default)]
pub struct HistogramAccumulator {
    inner: Mutex<Histogram>,
}

impl HistogramAccumulator {
    /// Create an accumulator holding an all-zero histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one private histogram into the shared counts.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous contributor panicked while holding the lock.
    pub fn merge(&self, local: &Histogram) -> Result<(), ParallelError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ParallelError::PoisonedAccumulator)?;
        guard.merge(local);
        Ok(())
    }

    /// Consume the accumulator and return the merged histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if a contributor panicked while holding the lock.
    pub fn into_inner(self) -> Result<Histogram, ParallelError> {
        self.inner
            .into_inner()
            .map_err(|_| ParallelError::PoisonedAccumulator)
    }
}
