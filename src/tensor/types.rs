//! Tensor value types.

use crate::constants::TENSOR_CHANNELS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense `f32` tensor with a row-major shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::InvalidTensor {
                message: format!(
                    "shape {shape:?} needs {expected} elements, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self { shape, data })
    }

    /// Dimensions, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat element view.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into shape and data.
    pub fn into_parts(self) -> (Vec<usize>, Vec<f32>) {
        (self.shape, self.data)
    }
}

/// Memory order of a `[1, C, H, W]` or `[1, H, W, C]` image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Channel planes: `[1, 3, H, W]`.
    Nchw,
    /// Interleaved channels: `[1, H, W, 3]`.
    Nhwc,
}

impl TensorLayout {
    /// Tensor shape for a `width × height` RGB image.
    pub fn shape(self, width: usize, height: usize) -> Vec<usize> {
        match self {
            Self::Nchw => vec![1, TENSOR_CHANNELS, height, width],
            Self::Nhwc => vec![1, height, width, TENSOR_CHANNELS],
        }
    }

    /// Flat offset of `(channel, row, col)`.
    pub fn index(self, channel: usize, row: usize, col: usize, width: usize, height: usize) -> usize {
        match self {
            Self::Nchw => channel * height * width + row * width + col,
            Self::Nhwc => (row * width + col) * TENSOR_CHANNELS + channel,
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nchw => write!(f, "nchw"),
            Self::Nhwc => write!(f, "nhwc"),
        }
    }
}

/// Mapping from an 8-bit channel value to a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalization {
    /// `v / 255`.
    UnitScale,
    /// `(v / 255 - mean[c]) / std[c]`.
    Standardize {
        /// Per-channel mean, RGB.
        mean: [f32; 3],
        /// Per-channel standard deviation, RGB. Must be positive.
        std: [f32; 3],
    },
}

impl Normalization {
    /// Reject non-positive or non-finite statistics.
    pub fn validate(&self) -> Result<()> {
        if let Self::Standardize { mean, std } = self {
            if let Some(s) = std.iter().find(|s| !s.is_finite() || **s <= 0.0) {
                return Err(Error::InvalidTensor {
                    message: format!("standard deviation must be positive, got {s}"),
                });
            }
            if mean.iter().any(|m| !m.is_finite()) {
                return Err(Error::InvalidTensor {
                    message: "mean values must be finite".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Normalized value of `value` on `channel` (0 = R, 1 = G, 2 = B).
    pub fn apply(&self, channel: usize, value: u8) -> f32 {
        let unit = f32::from(value) / 255.0;
        match self {
            Self::UnitScale => unit,
            Self::Standardize { mean, std } => (unit - mean[channel]) / std[channel],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_must_match_data() {
        assert!(Tensor::new(vec![1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(matches!(
            Tensor::new(vec![1, 2, 3], vec![0.0; 5]),
            Err(Error::InvalidTensor { .. })
        ));
    }

    #[test]
    fn test_layout_indices() {
        // 2x2 image, pixel (row 1, col 0), channel 2
        assert_eq!(TensorLayout::Nchw.index(2, 1, 0, 2, 2), 2 * 4 + 2);
        assert_eq!(TensorLayout::Nhwc.index(2, 1, 0, 2, 2), 2 * 3 + 2);
    }

    #[test]
    fn test_normalization_rejects_zero_std() {
        let norm = Normalization::Standardize {
            mean: [0.5; 3],
            std: [0.2, 0.0, 0.2],
        };
        assert!(norm.validate().is_err());
    }

    #[test]
    fn test_normalization_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            normalization: Normalization,
        }
        let parsed: Wrapper = toml::from_str(
            "normalization = { kind = \"standardize\", mean = [0.5, 0.5, 0.5], std = [0.25, 0.25, 0.25] }",
        )
        .unwrap();
        assert_eq!(
            parsed.normalization,
            Normalization::Standardize {
                mean: [0.5; 3],
                std: [0.25; 3]
            }
        );
    }
}
