use crate::histogram::{Histogram, NUM_BINS};

/// Error returned when there is no mass to normalise a histogram with.
#[derive(thiserror::Error, Debug, PartialEq)]
#[error("cannot derive an equalization map from {0} pixels")]
pub struct EmptyHistogramError(pub usize);

/// The probability and cumulative distributions of a histogram and the lookup table built from
/// them.
#[derive(Clone, Debug, PartialEq)]
pub struct EqualizationMap {
    /// `pdf[i] = hist[i] / total_pixels`.
    pub pdf: [f32; NUM_BINS],
    /// Running sum of the pdf.
    pub cdf: [f32; NUM_BINS],
    /// `lut[i] = round(cdf[i] * 255)`.
    pub lut: Lut,
}

impl EqualizationMap {
    /// Derive the pdf, cdf and lookup table of `hist`.
    ///
    /// The rounding is half away from zero, so a cdf value of `0.5` maps to `128`.
    ///
    /// # Arguments
    ///
    /// * `hist` - The histogram of the image to equalize.
    /// * `total_pixels` - The number of pixels the histogram was computed over.
    ///
    /// # Errors
    ///
    /// Returns an error if `total_pixels` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use histeq_imgproc::histogram::Histogram;
    /// use histeq_imgproc::lut::EqualizationMap;
    ///
    /// let hist = Histogram::from_pixels(&[0, 85, 170, 255]);
    /// let map = EqualizationMap::from_histogram(&hist, 4).unwrap();
    ///
    /// assert_eq!(map.lut[0], 64);
    /// assert_eq!(map.lut[85], 128);
    /// assert_eq!(map.lut[170], 191);
    /// assert_eq!(map.lut[255], 255);
    /// ```
    pub fn from_histogram(
        hist: &Histogram,
        total_pixels: usize,
    ) -> Result<Self, EmptyHistogramError> {
        if total_pixels == 0 {
            return Err(EmptyHistogramError(total_pixels));
        }

        let mut pdf = [0.0f32; NUM_BINS];
        for (p, &count) in pdf.iter_mut().zip(hist.as_slice()) {
            *p = count as f32 / total_pixels as f32;
        }

        let mut cdf = [0.0f32; NUM_BINS];
        cdf[0] = pdf[0];
        for i in 1..NUM_BINS {
            cdf[i] = cdf[i - 1] + pdf[i];
        }

        let mut lut = [0u8; NUM_BINS];
        for (l, &c) in lut.iter_mut().zip(cdf.iter()) {
            *l = (c * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Ok(Self {
            pdf,
            cdf,
            lut: Lut(lut),
        })
    }
}

/// A 256-entry intensity mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lut(pub [u8; NUM_BINS]);

impl Lut {
    /// The mapping that leaves every intensity unchanged.
    pub fn identity() -> Self {
        let mut lut = [0u8; NUM_BINS];
        for (i, l) in lut.iter_mut().enumerate() {
            *l = i as u8;
        }
        Self(lut)
    }

    /// Replace every sample `p` of `pixels` with `lut[p]`.
    pub fn apply(&self, pixels: &mut [u8]) {
        for px in pixels.iter_mut() {
            *px = self.0[*px as usize];
        }
    }

    /// Whether the mapping never decreases.
    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }

    /// The mapping as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Index<u8> for Lut {
    type Output = u8;

    fn index(&self, index: u8) -> &Self::Output {
        &self.0[index as usize]
    }
}
