//! Reusable offscreen drawing surface.

use super::PixelBuffer;
use image::{Rgba, RgbaImage, imageops};

/// Fixed-size RGBA canvas reused across requests.
///
/// Every [`Surface::draw`] clears the canvas first, so nothing from a previous
/// image can leak into the next one. Callers share a surface behind a mutex;
/// one draw-and-read happens at a time.
#[derive(Debug)]
pub struct Surface {
    canvas: RgbaImage,
    clear_color: Rgba<u8>,
}

impl Surface {
    /// Allocate a `width × height` surface cleared to `clear_color`.
    pub fn new(width: u32, height: u32, clear_color: [u8; 4]) -> Self {
        let clear_color = Rgba(clear_color);
        Self {
            canvas: RgbaImage::from_pixel(width, height, clear_color),
            clear_color,
        }
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Clear, draw `image` with its top-left corner at `(x, y)` and read the
    /// canvas back. Offsets may be negative; out-of-bounds parts are clipped.
    pub fn draw(&mut self, image: &RgbaImage, x: i64, y: i64) -> PixelBuffer {
        self.clear();
        imageops::replace(&mut self.canvas, image, x, y);
        PixelBuffer::from_rgba_image(self.canvas.clone())
    }

    fn clear(&mut self) {
        for px in self.canvas.pixels_mut() {
            *px = self.clear_color;
        }
    }
}
