//! RGBA pixels to normalized float tensors.

use super::{Normalization, Tensor, TensorLayout};
use crate::constants::{PIXEL_CHANNELS, TENSOR_CHANNELS};
use crate::error::Result;
use crate::imaging::{AlphaMode, PixelBuffer};

/// Per-channel lookup of all 256 normalized values.
type ChannelTable = [[f32; 256]; TENSOR_CHANNELS];

fn build_table(normalization: &Normalization) -> ChannelTable {
    let mut table = [[0.0f32; 256]; TENSOR_CHANNELS];
    for (channel, row) in table.iter_mut().enumerate() {
        for (value, slot) in (0..=u8::MAX).zip(row.iter_mut()) {
            *slot = normalization.apply(channel, value);
        }
    }
    table
}

/// `value * alpha / 255`, rounded.
#[allow(clippy::cast_possible_truncation)]
fn premultiply(value: u8, alpha: u8) -> u8 {
    ((u16::from(value) * u16::from(alpha) + 127) / 255) as u8
}

/// Encode an RGBA buffer as a `[1, 3, H, W]` or `[1, H, W, 3]` tensor.
///
/// Colour is read premultiplied: straight-alpha input is multiplied by
/// alpha first, so fully transparent pixels encode as black. Alpha itself
/// is then dropped. Element order follows `layout`:
/// NCHW puts channel `c` of pixel `(r, col)` at `c·H·W + r·W + col`,
/// NHWC at `(r·W + col)·3 + c`.
pub fn encode(
    pixels: &PixelBuffer,
    layout: TensorLayout,
    normalization: &Normalization,
) -> Result<Tensor> {
    normalization.validate()?;

    let width = pixels.width() as usize;
    let height = pixels.height() as usize;
    let table = build_table(normalization);
    let mut data = vec![0.0f32; width * height * TENSOR_CHANNELS];

    for (i, px) in pixels.as_bytes().chunks_exact(PIXEL_CHANNELS).enumerate() {
        let (row, col) = (i / width, i % width);
        for (channel, lut) in table.iter().enumerate() {
            let value = match pixels.alpha() {
                AlphaMode::Straight => premultiply(px[channel], px[3]),
                AlphaMode::Premultiplied => px[channel],
            };
            data[layout.index(channel, row, col, width, height)] = lut[usize::from(value)];
        }
    }

    Tensor::new(layout.shape(width, height), data)
}
