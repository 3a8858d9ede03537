//! Load, save, and resize collaborators around the core blend engine.
//!
//! File format handling is delegated entirely to the `image` crate; the
//! core only requires that the two decoded images, after resizing to the
//! common minimum dimensions, share width, height and channel count.

#[cfg(test)]
mod tests;

use std::{num::NonZeroUsize, path::Path};

use image::{DynamicImage, ExtendedColorType, GrayImage, RgbImage, RgbaImage, imageops};
use log::{debug, info};

use crate::{error::MorphError, image::ImageBuffer};

/// Decodes an image file into an [`ImageBuffer`].
///
/// 8-bit grayscale, RGB and RGBA layouts are preserved; anything else
/// (16-bit depths, gray+alpha) is normalized to 8-bit RGB.
pub fn load_image(path: &Path) -> Result<ImageBuffer, MorphError> {
    let decoded = image::open(path).map_err(|source| MorphError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded {} ({}x{})", path.display(), decoded.width(), decoded.height());
    from_dynamic(decoded)
}

/// Encodes an [`ImageBuffer`] to a file; the format follows the path's
/// extension.
pub fn save_image(img: &ImageBuffer, path: &Path) -> Result<(), MorphError> {
    let color = match img.channels().get() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        channels => {
            return Err(MorphError::Save {
                path: path.to_path_buf(),
                source: image::ImageError::Unsupported(
                    image::error::UnsupportedError::from_format_and_kind(
                        image::error::ImageFormatHint::Unknown,
                        image::error::UnsupportedErrorKind::GenericFeature(format!(
                            "{channels}-channel buffers cannot be encoded"
                        )),
                    ),
                ),
            });
        }
    };

    image::save_buffer(
        path,
        img.pixels(),
        img.width().get() as u32,
        img.height().get() as u32,
        color,
    )
    .map_err(|source| MorphError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Resamples an image to new dimensions with a triangle (bilinear) filter,
/// returning a fresh buffer. Dimensions and pixels are replaced together;
/// there is no intermediate state with a stale shape.
pub fn resize(
    img: &ImageBuffer,
    width: NonZeroUsize,
    height: NonZeroUsize,
) -> Result<ImageBuffer, MorphError> {
    if img.width() == width && img.height() == height {
        return Ok(img.clone());
    }

    let (w, h) = (width.get() as u32, height.get() as u32);
    let resized = match to_dynamic(img)? {
        DynamicImage::ImageLuma8(buf) => {
            DynamicImage::ImageLuma8(imageops::resize(&buf, w, h, imageops::FilterType::Triangle))
        }
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(imageops::resize(&buf, w, h, imageops::FilterType::Triangle))
        }
        DynamicImage::ImageRgba8(buf) => {
            DynamicImage::ImageRgba8(imageops::resize(&buf, w, h, imageops::FilterType::Triangle))
        }
        other => DynamicImage::ImageRgb8(imageops::resize(
            &other.to_rgb8(),
            w,
            h,
            imageops::FilterType::Triangle,
        )),
    };
    from_dynamic(resized)
}

/// Loads two source images and reconciles their shapes: both are resized
/// to the smaller common dimensions, and converted to RGB if their channel
/// counts disagree.
pub fn load_resized(path1: &Path, path2: &Path) -> Result<(ImageBuffer, ImageBuffer), MorphError> {
    let mut img1 = load_image(path1)?;
    let mut img2 = load_image(path2)?;

    if img1.channels() != img2.channels() {
        debug!(
            "channel counts differ ({} vs {}), converting both to RGB",
            img1.channels(),
            img2.channels()
        );
        img1 = to_rgb(&img1)?;
        img2 = to_rgb(&img2)?;
    }

    let width = img1.width().min(img2.width());
    let height = img1.height().min(img2.height());
    Ok((resize(&img1, width, height)?, resize(&img2, width, height)?))
}

fn to_rgb(img: &ImageBuffer) -> Result<ImageBuffer, MorphError> {
    if img.channels().get() == 3 {
        return Ok(img.clone());
    }
    from_dynamic(DynamicImage::ImageRgb8(to_dynamic(img)?.to_rgb8()))
}

fn from_dynamic(decoded: DynamicImage) -> Result<ImageBuffer, MorphError> {
    let width = decoded.width() as usize;
    let height = decoded.height() as usize;
    let (channels, pixels) = match decoded {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other => (3, other.to_rgb8().into_raw()),
    };

    let nz = |v: usize| {
        NonZeroUsize::new(v).ok_or(MorphError::BufferSizeMismatch {
            expected: 1,
            actual: 0,
        })
    };
    ImageBuffer::from_pixels(nz(width)?, nz(height)?, nz(channels)?, pixels)
}

fn to_dynamic(img: &ImageBuffer) -> Result<DynamicImage, MorphError> {
    let (w, h) = (img.width().get() as u32, img.height().get() as u32);
    let pixels = img.pixels().to_vec();
    let mismatch = MorphError::BufferSizeMismatch {
        expected: img.size(),
        actual: 0,
    };
    Ok(match img.channels().get() {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, pixels).ok_or(mismatch)?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, pixels).ok_or(mismatch)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, pixels).ok_or(mismatch)?),
        _ => return Err(mismatch),
    })
}
