//! Letterbox geometry shared by detector preprocessing and postprocessing.
//!
//! The same values drive both directions: the forward transform places the
//! resized image on the padded canvas, and the inverse maps canvas
//! coordinates back onto the original image. Keeping them in one struct is
//! what makes the inverse exact.

use crate::error::{Error, Result};

/// Placement of an `original_width × original_height` image inside a square
/// `input_size` canvas, preserving aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    original_width: u32,
    original_height: u32,
    input_size: u32,
    resized_width: u32,
    resized_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Compute placement for an image of the given size.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(original_width: u32, original_height: u32, input_size: u32) -> Result<Self> {
        if original_width == 0 || original_height == 0 {
            return Err(Error::EmptyImage {
                width: original_width,
                height: original_height,
            });
        }
        if input_size == 0 {
            return Err(Error::InvalidTensor {
                message: "letterbox input size must be positive".to_string(),
            });
        }

        let size = f64::from(input_size);
        let scale = (size / f64::from(original_width)).min(size / f64::from(original_height));

        // Rounded dims can overshoot by one on awkward ratios; clamp to canvas.
        let resized_width = ((f64::from(original_width) * scale).round() as u32).clamp(1, input_size);
        let resized_height =
            ((f64::from(original_height) * scale).round() as u32).clamp(1, input_size);

        Ok(Self {
            original_width,
            original_height,
            input_size,
            resized_width,
            resized_height,
            pad_x: (input_size - resized_width) / 2,
            pad_y: (input_size - resized_height) / 2,
        })
    }

    /// Original image width.
    pub fn original_width(&self) -> u32 {
        self.original_width
    }

    /// Original image height.
    pub fn original_height(&self) -> u32 {
        self.original_height
    }

    /// Canvas edge length.
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Size of the image after aspect-preserving resize.
    pub fn resized_size(&self) -> (u32, u32) {
        (self.resized_width, self.resized_height)
    }

    /// Left/top padding on the canvas.
    pub fn padding(&self) -> (u32, u32) {
        (self.pad_x, self.pad_y)
    }

    /// Horizontal scale actually applied to the original width.
    pub fn scale_x(&self) -> f32 {
        self.resized_width as f32 / self.original_width as f32
    }

    /// Vertical scale actually applied to the original height.
    pub fn scale_y(&self) -> f32 {
        self.resized_height as f32 / self.original_height as f32
    }

    /// Map a canvas x coordinate onto the original image, clamped to `[0, width]`.
    pub fn unmap_x(&self, x: f32) -> f32 {
        ((x - self.pad_x as f32) / self.scale_x()).clamp(0.0, self.original_width as f32)
    }

    /// Map a canvas y coordinate onto the original image, clamped to `[0, height]`.
    pub fn unmap_y(&self, y: f32) -> f32 {
        ((y - self.pad_y as f32) / self.scale_y()).clamp(0.0, self.original_height as f32)
    }
}
