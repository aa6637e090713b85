use histeq_image::{Image, ImageError, ImageSize};

/// Default divider thickness as a fraction of the stacked extent.
pub const DEFAULT_DIVIDER_PERCENT: f64 = 0.005;

/// Direction in which two images are placed next to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackDirection {
    /// `first` on the left, `second` on the right.
    Horizontal,
    /// `first` on top, `second` below.
    Vertical,
}

/// Place two gray images next to each other with a divider between them.
///
/// The divider is `max(1, round(extent * divider_percent))` pixels thick, where `extent` is the sum
/// of the widths (horizontal) or heights (vertical) of the inputs. The shorter image is padded with
/// `divider_value`.
///
/// # Example
///
/// ```
/// use histeq_image::{Image, ImageSize};
/// use histeq_imgproc::stack::{stack_images, StackDirection};
///
/// let a = Image::<u8, 1>::new(ImageSize { width: 1, height: 2 }, vec![1, 1]).unwrap();
/// let b = Image::<u8, 1>::new(ImageSize { width: 2, height: 1 }, vec![2, 2]).unwrap();
///
/// let out = stack_images(&a, &b, StackDirection::Horizontal, 0.0, 0).unwrap();
/// assert_eq!(out.size(), ImageSize { width: 4, height: 2 });
/// assert_eq!(out.as_slice(), &[1, 0, 2, 2, 1, 0, 0, 0]);
/// ```
pub fn stack_images(
    first: &Image<u8, 1>,
    second: &Image<u8, 1>,
    direction: StackDirection,
    divider_percent: f64,
    divider_value: u8,
) -> Result<Image<u8, 1>, ImageError> {
    let extent = match direction {
        StackDirection::Horizontal => first.width() + second.width(),
        StackDirection::Vertical => first.height() + second.height(),
    };
    let thickness = ((extent as f64 * divider_percent).round() as usize).max(1);

    let (size, second_origin) = match direction {
        StackDirection::Horizontal => (
            ImageSize {
                width: extent + thickness,
                height: first.height().max(second.height()),
            },
            (first.width() + thickness, 0),
        ),
        StackDirection::Vertical => (
            ImageSize {
                width: first.width().max(second.width()),
                height: extent + thickness,
            },
            (0, first.height() + thickness),
        ),
    };

    let mut out = Image::<u8, 1>::from_size_val(size, divider_value)?;
    blit(&mut out, first, (0, 0));
    blit(&mut out, second, second_origin);
    Ok(out)
}

fn blit(dst: &mut Image<u8, 1>, src: &Image<u8, 1>, origin: (usize, usize)) {
    let (x0, y0) = origin;
    let dst_width = dst.width();
    let width = src.width();
    if width == 0 {
        return;
    }
    let data = dst.as_slice_mut();
    for (y, row) in src.as_slice().chunks_exact(width).enumerate() {
        let start = (y0 + y) * dst_width + x0;
        data[start..start + width].copy_from_slice(row);
    }
}
