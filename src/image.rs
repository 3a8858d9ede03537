#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use crate::error::{MorphError, Shape};

/// A decoded raster image: dimensions, channel count, and an owned
/// contiguous buffer of 8-bit samples in row-major order.
///
/// The buffer length is always exactly `width * height * channels`; the
/// only way to change the dimensions is to construct a new buffer, so the
/// invariant cannot be broken by partial mutation. Buffers are never shared
/// between processes by reference, only copied through the communicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: NonZeroUsize,
    height: NonZeroUsize,
    channels: NonZeroUsize,
    pixels: Vec<u8>,
}

impl ImageBuffer {
    /// Creates a zero-filled image of the given shape.
    #[must_use]
    pub fn new(width: NonZeroUsize, height: NonZeroUsize, channels: NonZeroUsize) -> Self {
        Self {
            width,
            height,
            channels,
            pixels: vec![0; width.get() * height.get() * channels.get()],
        }
    }

    /// Wraps an existing pixel buffer, verifying it matches the shape.
    pub fn from_pixels(
        width: NonZeroUsize,
        height: NonZeroUsize,
        channels: NonZeroUsize,
        pixels: Vec<u8>,
    ) -> Result<Self, MorphError> {
        let expected = width.get() * height.get() * channels.get();
        if pixels.len() != expected {
            return Err(MorphError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> NonZeroUsize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> NonZeroUsize {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> NonZeroUsize {
        self.channels
    }

    /// Total size of the pixel buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape {
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Whether `other` has the same width, height and channel count.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }
}
