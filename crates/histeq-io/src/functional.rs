use std::path::{Path, PathBuf};

use histeq_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path and converts it to 8-bit gray.
///
/// The method tries to read from any image format supported by the image crate. Color images are
/// converted to a single luma channel.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// A gray image with a single channel (mono8).
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be decoded.
pub fn read_image_any_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let file_path = file_path.as_ref().to_owned();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path));
    }

    let img = image::ImageReader::open(&file_path)?
        .with_guessed_format()?
        .decode()?;

    if img.color() != image::ColorType::L8 {
        log::info!(
            "{} is {:?}, converting to grayscale",
            file_path.display(),
            img.color()
        );
    }

    let size = ImageSize::from([img.width() as usize, img.height() as usize]);

    Ok(Image::new(size, img.into_luma8().into_raw())?)
}

/// Writes a gray image to the given file path.
///
/// The encoding follows the file extension. The data is first written to a temporary file next to
/// the destination and then renamed, so a failed write leaves no partial file behind.
///
/// # Arguments
///
/// * `file_path` - The destination path.
/// * `image` - The image to write.
///
/// # Errors
///
/// Returns an error if the extension is unknown or the file cannot be written.
pub fn write_image_gray8(file_path: impl AsRef<Path>, image: &Image<u8, 1>) -> Result<(), IoError> {
    let file_path = file_path.as_ref();

    let format = image::ImageFormat::from_path(file_path)
        .map_err(|_| IoError::InvalidFileExtension(file_path.to_path_buf()))?;

    let tmp_path = temporary_sibling(file_path);
    let res = image::save_buffer_with_format(
        &tmp_path,
        image.as_slice(),
        image.width() as u32,
        image.height() as u32,
        image::ExtendedColorType::L8,
        format,
    );

    if let Err(e) = res {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    std::fs::rename(&tmp_path, file_path)?;
    log::debug!("wrote {}", file_path.display());

    Ok(())
}

fn temporary_sibling(file_path: &Path) -> PathBuf {
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use histeq_image::{Image, ImageSize};

    use super::*;

    #[test]
    fn read_missing_file() {
        let res = read_image_any_gray8("does/not/exist.png");
        assert!(matches!(res, Err(IoError::FileDoesNotExist(_))));
    }

    #[test]
    fn write_read_png() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray.png");

        let image = Image::<u8, 1>::new(
            ImageSize {
                width: 3,
                height: 2,
            },
            vec![0, 50, 100, 150, 200, 250],
        )?;
        write_image_gray8(&file_path, &image)?;
        assert!(file_path.exists());
        assert!(!temporary_sibling(&file_path).exists());

        let read = read_image_any_gray8(&file_path)?;
        assert_eq!(read, image);
        Ok(())
    }

    #[test]
    fn read_rgb_as_gray() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("rgb.png");

        let rgb = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 200, 200]));
        rgb.save(&file_path)?;

        let gray = read_image_any_gray8(&file_path)?;
        assert_eq!(
            gray.size(),
            ImageSize {
                width: 4,
                height: 3
            }
        );
        assert!(gray.as_slice().iter().all(|&p| p == 200));
        Ok(())
    }

    #[test]
    fn write_unknown_extension() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gray.unknown");
        let image = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 1,
                height: 1,
            },
            0,
        )?;

        let res = write_image_gray8(&file_path, &image);
        assert!(matches!(res, Err(IoError::InvalidFileExtension(_))));
        assert!(!file_path.exists());
        Ok(())
    }

    #[test]
    fn read_garbage() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("garbage.png");
        std::fs::write(&file_path, b"not an image")?;

        let res = read_image_any_gray8(&file_path);
        assert!(matches!(res, Err(IoError::ImageDecodeError(_))));
        Ok(())
    }
}
