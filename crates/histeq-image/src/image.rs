use crate::error::ImageError;
use crate::partition::{validate_partitions, RowPartition};

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use histeq_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl ImageSize {
    /// Number of pixels covered by this size.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether the size has no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with pixel data.
///
/// The pixels are stored row-major with interleaved channels and no padding, so row `r` occupies
/// `data[r * cols * C..(r + 1) * cols * C]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const C: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const C: usize> Image<T, C> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Returns
    ///
    /// A new image with the given pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use histeq_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 1>::new(
    ///    ImageSize {
    ///       width: 10,
    ///       height: 20,
    ///    },
    ///    vec![0u8; 10 * 20],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 1);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        // check if the data length matches the image size
        if data.len() != size.width * size.height * C {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.width * size.height * C,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `val` - The default value of the pixel data.
    ///
    /// # Examples
    ///
    /// ```
    /// use histeq_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 1>::from_size_val(
    ///   ImageSize {
    ///     width: 10,
    ///     height: 20,
    ///   }, 0u8).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * C];
        Image::new(size, data)
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        C
    }

    /// Get the number of pixels in the image.
    pub fn num_pixels(&self) -> usize {
        self.size.num_pixels()
    }

    /// Whether the image has zero rows or zero columns.
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Number of samples in one row.
    pub fn row_stride(&self) -> usize {
        self.size.width * C
    }

    /// Get the pixel data as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the pixel data as a mutable slice.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get a reference to the sample at `[row, col, channel]`.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [y, x, ch] = index;
        if y >= self.rows() || x >= self.cols() || ch >= C {
            return None;
        }
        self.data.get((y * self.cols() + x) * C + ch)
    }

    /// Get the sample at `(x, y)` for the channel `ch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are out of bounds.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<T, ImageError>
    where
        T: Copy,
    {
        self.get([y, x, ch]).copied().ok_or(ImageError::PixelIndexOutOfBounds(
            x,
            y,
            self.width(),
            self.height(),
        ))
    }

    /// Borrow the samples of the rows `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is reversed or goes past the last row.
    pub fn rows_slice(&self, start: usize, end: usize) -> Result<&[T], ImageError> {
        if start > end || end > self.rows() {
            return Err(ImageError::InvalidRowRange {
                start,
                end,
                rows: self.rows(),
            });
        }
        let stride = self.row_stride();
        Ok(&self.data[start * stride..end * stride])
    }

    /// Borrow one read-only block of rows per partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the partitions do not tile the image rows.
    pub fn row_blocks(&self, parts: &[RowPartition]) -> Result<Vec<&[T]>, ImageError> {
        validate_partitions(parts, self.rows())?;
        let stride = self.row_stride();
        Ok(parts
            .iter()
            .map(|p| &self.data[p.offset * stride..p.end() * stride])
            .collect())
    }

    /// Split the image into one mutable block of rows per partition.
    ///
    /// The blocks are disjoint, so each can be handed to a different worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the partitions do not tile the image rows.
    ///
    /// # Example
    ///
    /// ```
    /// use histeq_image::{partition_rows, Image, ImageSize};
    ///
    /// let mut image = Image::<u8, 1>::new(
    ///     ImageSize { width: 2, height: 3 },
    ///     vec![0, 1, 2, 3, 4, 5],
    /// ).unwrap();
    ///
    /// let parts = partition_rows(image.rows(), 2).unwrap();
    /// let blocks = image.row_blocks_mut(&parts).unwrap();
    /// assert_eq!(blocks[0], &[0, 1, 2, 3]);
    /// assert_eq!(blocks[1], &[4, 5]);
    /// ```
    pub fn row_blocks_mut(&mut self, parts: &[RowPartition]) -> Result<Vec<&mut [T]>, ImageError> {
        validate_partitions(parts, self.rows())?;
        let stride = self.row_stride();

        let mut blocks = Vec::with_capacity(parts.len());
        let mut rest = self.data.as_mut_slice();
        for part in parts {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(part.count * stride);
            blocks.push(block);
            rest = tail;
        }

        Ok(blocks)
    }
}
