use std::io::Cursor;
use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat};

use crate::domain::PixelArray;
use crate::error::{Error, Result};

/// Decode an image file into an 8-bit pixel array.
///
/// The channel count of the source is kept (gray, gray+alpha, RGB, RGBA).
/// Deeper or float formats are narrowed to 8 bits per sample.
pub fn load(path: &Path) -> Result<PixelArray> {
    let img = image::open(path)?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    log::debug!("decoded {} as {:?}", path.display(), img.color());

    let (channels, samples) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other => match other.color().channel_count() {
            1 => (1, other.to_luma8().into_raw()),
            2 => (2, other.to_luma_alpha8().into_raw()),
            3 => (3, other.to_rgb8().into_raw()),
            _ => (4, other.to_rgba8().into_raw()),
        },
    };

    PixelArray::new(height, width, channels, samples)
}

/// Encode a pixel array to `path`, picking the format from the extension.
/// The image is encoded in memory first; the file is only created once
/// encoding succeeded.
pub fn save(pixels: &PixelArray, path: &Path) -> Result<()> {
    let color = match pixels.channels() {
        1 => ColorType::L8,
        2 => ColorType::La8,
        3 => ColorType::Rgb8,
        4 => ColorType::Rgba8,
        n => return Err(Error::UnsupportedChannels(n)),
    };
    let too_large = || Error::DimensionsTooLarge {
        width: pixels.width(),
        height: pixels.height(),
    };
    let width = u32::try_from(pixels.width()).map_err(|_| too_large())?;
    let height = u32::try_from(pixels.height()).map_err(|_| too_large())?;

    let save_failed = |message: String| Error::SaveFailed {
        path: path.to_path_buf(),
        message,
    };
    let format = ImageFormat::from_path(path).map_err(|e| save_failed(e.to_string()))?;

    let mut encoded = Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut encoded,
        pixels.as_bytes(),
        width,
        height,
        color,
        format,
    )
    .map_err(|e| save_failed(e.to_string()))?;
    std::fs::write(path, encoded.into_inner()).map_err(|e| save_failed(e.to_string()))?;
    log::debug!("wrote {}x{} image to {}", width, height, path.display());
    Ok(())
}

/// Whether the output format keeps samples bit-exact through encode/decode.
/// JPEG and other lossy encoders discard the perturbation.
pub fn is_lossless_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "png" | "bmp" | "tif" | "tiff" | "webp"
            )
        })
}
