use histeq_image::{partition_rows, Image};

use super::{derive_map, ensure_not_empty, EqualizeError, EqualizeOutput, Equalizer};
use crate::histogram::{Histogram, HistogramAccumulator};
use crate::parallel::{build_thread_pool, try_for_each_block};

/// Equalizes with a fixed pool of workers that each own a contiguous block of rows.
///
/// Workers count their block into a private histogram and merge it into a shared accumulator.
/// The lookup table is derived on the calling thread once every block has been merged, then each
/// worker maps its own block in place and merges a private post histogram the same way.
#[derive(Clone, Copy, Debug)]
pub struct SharedMemoryEqualizer {
    num_workers: usize,
}

impl SharedMemoryEqualizer {
    /// Create an equalizer that runs on `num_workers` threads.
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }
}

impl Equalizer for SharedMemoryEqualizer {
    fn equalize(&self, mut image: Image<u8, 1>) -> Result<EqualizeOutput, EqualizeError> {
        ensure_not_empty(&image)?;

        let pool = build_thread_pool(self.num_workers)?;
        let parts = partition_rows(image.rows(), self.num_workers)?;
        log::debug!(
            "shared equalizer: {} rows over {} workers {:?}",
            image.rows(),
            self.num_workers,
            parts
        );

        let before = HistogramAccumulator::new();
        try_for_each_block(&pool, image.row_blocks(&parts)?, |_, block| {
            before.merge(&Histogram::from_pixels(block))
        })?;
        let hist_before = before.into_inner()?;

        let map = derive_map(&hist_before, image.num_pixels())?;
        let lut = map.lut;

        let after = HistogramAccumulator::new();
        try_for_each_block(&pool, image.row_blocks_mut(&parts)?, |_, block| {
            lut.apply(block);
            after.merge(&Histogram::from_pixels(block))
        })?;
        let hist_after = after.into_inner()?;

        Ok(EqualizeOutput {
            image,
            hist_before,
            hist_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use histeq_image::ImageSize;

    use super::*;
    use crate::equalize::SequentialEqualizer;
    use crate::histogram::compute_histogram;
    use crate::parallel::ParallelError;

    fn four_levels() -> Result<Image<u8, 1>, EqualizeError> {
        Ok(Image::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 85, 170, 255],
        )?)
    }

    #[test]
    fn test_worker_count_invariance() -> Result<(), EqualizeError> {
        let expected = SequentialEqualizer.equalize(four_levels()?)?;
        for num_workers in [1, 2, 4] {
            let out = SharedMemoryEqualizer::new(num_workers).equalize(four_levels()?)?;
            assert_eq!(out, expected, "num_workers={num_workers}");
        }
        Ok(())
    }

    #[test]
    fn test_more_workers_than_rows() -> Result<(), EqualizeError> {
        let image = Image::new(
            ImageSize {
                width: 5,
                height: 3,
            },
            (0..15).map(|i| (i * 17) as u8).collect(),
        )?;
        let expected = SequentialEqualizer.equalize(image.clone())?;
        let out = SharedMemoryEqualizer::new(8).equalize(image)?;
        assert_eq!(out, expected);
        Ok(())
    }

    #[test]
    fn test_post_histogram_matches_full_scan() -> Result<(), EqualizeError> {
        let image = Image::new(
            ImageSize {
                width: 7,
                height: 11,
            },
            (0..77u32).map(|i| (i * i % 251) as u8).collect(),
        )?;
        let out = SharedMemoryEqualizer::new(3).equalize(image)?;
        assert_eq!(out.hist_after, compute_histogram(&out.image));
        Ok(())
    }

    #[test]
    fn test_zero_workers() -> Result<(), EqualizeError> {
        let res = SharedMemoryEqualizer::new(0).equalize(four_levels()?);
        assert_eq!(
            res,
            Err(EqualizeError::Parallel(ParallelError::InvalidThreadCount(0)))
        );
        Ok(())
    }
}
