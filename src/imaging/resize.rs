//! Resize policies.

use super::{Letterbox, PixelBuffer, Surface};
use crate::error::{Error, Result};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Scale `src` to exactly `width × height`, ignoring aspect ratio.
pub fn stretch_to_fit(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    imageops::resize(src, width, height, FilterType::CatmullRom)
}

/// Scale so the shorter edge equals `shorter_edge`, then take a centered
/// crop the size of `surface`.
///
/// The crop offset is floored, so with an odd remainder the extra column or
/// row is dropped from the right/bottom.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn shortest_edge_center_crop(
    src: &RgbaImage,
    shorter_edge: u32,
    surface: &mut Surface,
) -> Result<PixelBuffer> {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage { width, height });
    }
    if shorter_edge < surface.width().max(surface.height()) {
        return Err(Error::InvalidTensor {
            message: format!(
                "shorter edge {shorter_edge} is smaller than the {}x{} crop",
                surface.width(),
                surface.height()
            ),
        });
    }

    let scale = f64::from(shorter_edge) / f64::from(width.min(height));
    let scaled_w = ((f64::from(width) * scale).round() as u32).max(1);
    let scaled_h = ((f64::from(height) * scale).round() as u32).max(1);
    let scaled = stretch_to_fit(src, scaled_w, scaled_h);

    let crop_x = i64::from(scaled_w.saturating_sub(surface.width()) / 2);
    let crop_y = i64::from(scaled_h.saturating_sub(surface.height()) / 2);

    Ok(surface.draw(&scaled, -crop_x, -crop_y))
}

/// Aspect-preserving resize onto a padded square canvas.
///
/// `surface` must be square; its clear colour is the padding colour.
pub fn letterbox(src: &RgbaImage, surface: &mut Surface) -> Result<(PixelBuffer, Letterbox)> {
    if surface.width() != surface.height() {
        return Err(Error::InvalidTensor {
            message: format!(
                "letterbox surface must be square, got {}x{}",
                surface.width(),
                surface.height()
            ),
        });
    }

    let (width, height) = src.dimensions();
    let geometry = Letterbox::new(width, height, surface.width())?;
    let (resized_w, resized_h) = geometry.resized_size();
    let (pad_x, pad_y) = geometry.padding();

    let resized = stretch_to_fit(src, resized_w, resized_h);
    let pixels = surface.draw(&resized, i64::from(pad_x), i64::from(pad_y));
    Ok((pixels, geometry))
}
