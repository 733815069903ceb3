//! Decoded RGBA pixel buffer.

use crate::constants::PIXEL_CHANNELS;
use crate::error::{Error, Result};
use image::RgbaImage;
use serde::Serialize;

/// How the alpha channel relates to the colour channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphaMode {
    /// Colour channels are independent of alpha.
    Straight,
    /// Colour channels are already multiplied by alpha.
    Premultiplied,
}

/// Immutable `width × height` RGBA8 pixel data in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
    alpha: AlphaMode,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking that the length matches the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>, alpha: AlphaMode) -> Result<Self> {
        let expected = width as usize * height as usize * PIXEL_CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidTensor {
                message: format!(
                    "pixel buffer of {width}x{height} needs {expected} bytes, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            alpha,
        })
    }

    /// Take ownership of a decoded image. `image` always yields straight alpha.
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
            alpha: AlphaMode::Straight,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Alpha convention of the stored pixels.
    pub fn alpha(&self) -> AlphaMode {
        self.alpha
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA value at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * PIXEL_CHANNELS;
        let px = &self.data[offset..offset + PIXEL_CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = PixelBuffer::new(2, 2, vec![0; 15], AlphaMode::Straight);
        assert!(matches!(result, Err(Error::InvalidTensor { .. })));
    }

    #[test]
    fn test_pixel_lookup() {
        let mut data = vec![0u8; 2 * 2 * 4];
        data[12..16].copy_from_slice(&[1, 2, 3, 4]);
        let buf = PixelBuffer::new(2, 2, data, AlphaMode::Straight).unwrap();
        assert_eq!(buf.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(buf.pixel(2, 0), None);
    }
}
