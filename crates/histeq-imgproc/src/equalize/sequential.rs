use histeq_image::Image;

use super::{derive_map, ensure_not_empty, EqualizeError, EqualizeOutput, Equalizer};
use crate::histogram::compute_histogram;

/// Equalizes on the calling thread in four strictly ordered steps: histogram, lookup table,
/// in-place mapping, post histogram.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialEqualizer;

impl Equalizer for SequentialEqualizer {
    fn equalize(&self, mut image: Image<u8, 1>) -> Result<EqualizeOutput, EqualizeError> {
        ensure_not_empty(&image)?;

        let hist_before = compute_histogram(&image);
        let map = derive_map(&hist_before, image.num_pixels())?;
        map.lut.apply(image.as_slice_mut());
        let hist_after = compute_histogram(&image);

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

    #[test]
    fn test_sequential_four_levels() -> Result<(), EqualizeError> {
        let image = Image::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 85, 170, 255],
        )?;

        let out = SequentialEqualizer.equalize(image)?;
        assert_eq!(out.image.as_slice(), &[64, 128, 191, 255]);

        for v in [0, 85, 170, 255] {
            assert_eq!(out.hist_before[v], 1);
        }
        for v in [64, 128, 191, 255] {
            assert_eq!(out.hist_after[v], 1);
        }
        assert_eq!(out.hist_before.total(), 4);
        assert_eq!(out.hist_after.total(), 4);
        Ok(())
    }

    #[test]
    fn test_sequential_empty() -> Result<(), EqualizeError> {
        let image = Image::new(
            ImageSize {
                width: 0,
                height: 3,
            },
            vec![],
        )?;
        assert_eq!(
            SequentialEqualizer.equalize(image),
            Err(EqualizeError::EmptyImage(0, 3))
        );
        Ok(())
    }

    #[test]
    fn test_sequential_stretches_narrow_range() -> Result<(), EqualizeError> {
        let data = (0..64u32).map(|i| 100 + (i % 8) as u8).collect::<Vec<_>>();
        let image = Image::new(
            ImageSize {
                width: 8,
                height: 8,
            },
            data,
        )?;

        let out = SequentialEqualizer.equalize(image)?;
        let min = out.image.as_slice().iter().copied().min();
        let max = out.image.as_slice().iter().copied().max();
        assert_eq!(min, Some(32));
        assert_eq!(max, Some(255));
        Ok(())
    }
}
