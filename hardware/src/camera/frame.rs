use image::RgbImage;
use shared::image_size::ImageSize;
use std::path::Path;

use super::{CameraError, CameraResult};

/// One captured colour frame.
///
/// Pixels are stored RGB regardless of the order the driver delivered them
/// in, so the image can be shown or encoded without further conversion.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    frame_number: u64,
}

impl Frame {
    /// Build a frame from packed BGR rows.
    ///
    /// # Arguments
    /// * `data` - Raw image memory
    /// * `size` - Frame dimensions
    /// * `line_increment` - Bytes between the starts of consecutive rows
    /// * `frame_number` - Sequence number to attach
    pub fn from_bgr_packed(
        data: &[u8],
        size: ImageSize,
        line_increment: usize,
        frame_number: u64,
    ) -> CameraResult<Self> {
        let row_bytes = size.width * 3;
        let expected = line_increment.max(row_bytes) * size.height;
        if data.len() < expected {
            return Err(CameraError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        let mut rgb = Vec::with_capacity(size.pixel_count() * 3);
        for row in 0..size.height {
            let start = row * line_increment.max(row_bytes);
            for bgr in data[start..start + row_bytes].chunks_exact(3) {
                rgb.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
            }
        }

        let (width, height) = size.to_u32();
        let image = RgbImage::from_raw(width, height, rgb).ok_or(CameraError::BufferSize {
            expected,
            actual: data.len(),
        })?;

        Ok(Self {
            image,
            frame_number,
        })
    }

    /// All-black frame, used when the driver produced nothing usable
    pub fn blank(size: ImageSize, frame_number: u64) -> Self {
        let (width, height) = size.to_u32();
        Self {
            image: RgbImage::new(width, height),
            frame_number,
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::of_image(&self.image)
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable pixels for drawing overlays; the dimensions cannot change
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Encode to `path`, format chosen from the extension
    pub fn save(&self, path: &Path) -> CameraResult<()> {
        self.image.save(path)?;
        Ok(())
    }
}
