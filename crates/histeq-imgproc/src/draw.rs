use std::fmt::Write;

use histeq_image::{Image, ImageError, ImageSize};

use crate::histogram::{Histogram, NUM_BINS};

/// Maximum length of an ascii histogram bar.
pub const ASCII_BAR_WIDTH: usize = 50;

/// Size of the plot produced by [`draw_histogram`].
pub const HISTOGRAM_PLOT_SIZE: ImageSize = ImageSize {
    width: 512,
    height: 400,
};

/// Render the non-empty bins of `hist` as lines of `#` under a title.
///
/// Bars are scaled so the largest bin is about [`ASCII_BAR_WIDTH`] characters long.
///
/// # Example
///
/// ```
/// use histeq_imgproc::draw::histogram_ascii;
/// use histeq_imgproc::histogram::Histogram;
///
/// let text = histogram_ascii(&Histogram::from_pixels(&[3, 3, 9]), "before");
/// assert_eq!(text, "=== before ===\n[  3] ## (2)\n[  9] # (1)\n");
/// ```
pub fn histogram_ascii(hist: &Histogram, title: &str) -> String {
    let scale = (hist.max_count() / ASCII_BAR_WIDTH).max(1);

    let mut out = String::new();
    let _ = writeln!(out, "=== {title} ===");
    for (intensity, &count) in hist.as_slice().iter().enumerate() {
        if count == 0 {
            continue;
        }
        let bar = "#".repeat(count / scale);
        let _ = writeln!(out, "[{intensity:>3}] {bar} ({count})");
    }
    out
}

/// Draw `hist` as black bars on a white [`HISTOGRAM_PLOT_SIZE`] image.
///
/// Bar heights are normalised by the largest bin. Each bar spans `bin_width + 1` columns, from
/// `bin * bin_width` to `(bin + 1) * bin_width` inclusive. An all-zero histogram gives a blank plot.
///
/// # Errors
///
/// Returns an error if the plot buffer cannot be created.
pub fn draw_histogram(hist: &Histogram) -> Result<Image<u8, 1>, ImageError> {
    let ImageSize { width, height } = HISTOGRAM_PLOT_SIZE;
    let mut plot = Image::<u8, 1>::from_size_val(HISTOGRAM_PLOT_SIZE, 255)?;

    let max_count = hist.max_count();
    if max_count == 0 {
        return Ok(plot);
    }

    let bin_width = (width as f64 / NUM_BINS as f64).round() as usize;
    let data = plot.as_slice_mut();
    for (bin, &count) in hist.as_slice().iter().enumerate() {
        let bar_height = (count as f64 / max_count as f64 * height as f64) as usize;
        // both x ends are filled, so a bar overlaps the first column of the next bin
        let x0 = (bin * bin_width).min(width);
        let x1 = ((bin + 1) * bin_width + 1).min(width);
        for y in height - bar_height..height {
            data[y * width + x0..y * width + x1].fill(0);
        }
    }

    Ok(plot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_skips_empty_bins() {
        let text = histogram_ascii(&Histogram::new(), "empty");
        assert_eq!(text, "=== empty ===\n");
    }

    #[test]
    fn test_ascii_scales_long_bars() {
        let hist = Histogram::from_pixels(&[7u8; 500]);
        let text = histogram_ascii(&hist, "t");
        let line = text.lines().nth(1).unwrap_or_default();
        assert_eq!(line, format!("[  7] {} (500)", "#".repeat(50)));
    }

    #[test]
    fn test_draw_histogram() -> Result<(), ImageError> {
        let mut pixels = vec![0u8; 10];
        pixels.extend([255u8; 5]);
        let plot = draw_histogram(&Histogram::from_pixels(&pixels))?;

        assert_eq!(plot.size(), HISTOGRAM_PLOT_SIZE);
        // full height bar for bin 0, three columns wide
        assert_eq!(plot.get_pixel(0, 0, 0)?, 0);
        assert_eq!(plot.get_pixel(1, 399, 0)?, 0);
        assert_eq!(plot.get_pixel(2, 0, 0)?, 0);
        assert_eq!(plot.get_pixel(3, 0, 0)?, 255);
        // half height bar for bin 255
        assert_eq!(plot.get_pixel(510, 199, 0)?, 255);
        assert_eq!(plot.get_pixel(511, 200, 0)?, 0);
        // nothing in between
        assert_eq!(plot.get_pixel(100, 399, 0)?, 255);
        assert_eq!(plot.get_pixel(509, 399, 0)?, 255);
        Ok(())
    }

    #[test]
    fn test_draw_adjacent_bars_overlap() -> Result<(), ImageError> {
        // bins 10 and 11 share column 22
        let mut pixels = vec![10u8; 4];
        pixels.extend([11u8; 2]);
        let plot = draw_histogram(&Histogram::from_pixels(&pixels))?;

        assert_eq!(plot.get_pixel(20, 0, 0)?, 0);
        assert_eq!(plot.get_pixel(22, 0, 0)?, 0);
        assert_eq!(plot.get_pixel(23, 0, 0)?, 255);
        assert_eq!(plot.get_pixel(23, 399, 0)?, 0);
        assert_eq!(plot.get_pixel(24, 399, 0)?, 0);
        assert_eq!(plot.get_pixel(25, 399, 0)?, 255);
        Ok(())
    }

    #[test]
    fn test_draw_empty_histogram() -> Result<(), ImageError> {
        let plot = draw_histogram(&Histogram::new())?;
        assert!(plot.as_slice().iter().all(|&p| p == 255));
        Ok(())
    }
}
