//! Image dimensions and size utilities

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image dimensions structure
///
/// Represents the width and height of a camera sensor or frame in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl ImageSize {
    /// Create a new ImageSize
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size of an existing image
    pub fn of_image<I: GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self::from_width_height(width as usize, height as usize)
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes in one packed row for the given pixel depth.
    ///
    /// Partial bytes round up, so 12 bits per pixel still uses 2 bytes.
    pub fn line_increment(&self, bits_per_pixel: u32) -> usize {
        self.width * bits_per_pixel.div_ceil(8) as usize
    }

    /// Bytes in a packed buffer holding the whole image
    pub fn buffer_len(&self, bits_per_pixel: u32) -> usize {
        self.line_increment(bits_per_pixel) * self.height
    }

    /// Convert to u32 dimensions for image buffers.
    ///
    /// Sensor sizes comfortably fit in u32; anything larger saturates.
    pub fn to_u32(&self) -> (u32, u32) {
        (
            u32::try_from(self.width).unwrap_or(u32::MAX),
            u32::try_from(self.height).unwrap_or(u32::MAX),
        )
    }

    /// Convert to tuple (width, height)
    pub fn to_tuple(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::from_width_height(dimensions.0, dimensions.1)
    }
}

impl From<ImageSize> for (usize, usize) {
    fn from(size: ImageSize) -> Self {
        size.to_tuple()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
