//! Image URI to model input tensor.

use crate::config::{ClassificationConfig, DetectionConfig};
use crate::constants::detection::PAD_COLOR;
use crate::error::Result;
use crate::imaging::{self, Letterbox, Surface};
use crate::tensor::{self, Normalization, Tensor, TensorLayout};
use std::sync::{Arc, Mutex, PoisonError};

/// Crop colour; the crop is always fully covered so it never shows.
const CROP_CLEAR: [u8; 4] = [0, 0, 0, 0];

/// Decode, resize shorter edge, center-crop, encode.
#[derive(Debug, Clone)]
pub struct ClassificationPreprocessor {
    resize_shorter: u32,
    layout: TensorLayout,
    normalization: Normalization,
    surface: Arc<Mutex<Surface>>,
}

impl ClassificationPreprocessor {
    /// Preprocessor sized from config.
    pub fn new(config: &ClassificationConfig) -> Self {
        Self {
            resize_shorter: config.resize_shorter,
            layout: config.layout,
            normalization: config.normalization,
            surface: Arc::new(Mutex::new(Surface::new(
                config.input_size,
                config.input_size,
                CROP_CLEAR,
            ))),
        }
    }

    /// Tensor for the image at `uri`.
    pub fn prepare(&self, uri: &str) -> Result<Tensor> {
        let image = imaging::load_image(uri)?;
        let pixels = {
            let mut surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
            imaging::shortest_edge_center_crop(&image, self.resize_shorter, &mut surface)?
        };
        tensor::encode(&pixels, self.layout, &self.normalization)
    }
}

/// Decode, letterbox, encode.
#[derive(Debug, Clone)]
pub struct DetectionPreprocessor {
    layout: TensorLayout,
    normalization: Normalization,
    surface: Arc<Mutex<Surface>>,
}

impl DetectionPreprocessor {
    /// Preprocessor sized from config.
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            layout: config.layout,
            normalization: config.normalization,
            surface: Arc::new(Mutex::new(Surface::new(
                config.input_size,
                config.input_size,
                PAD_COLOR,
            ))),
        }
    }

    /// Tensor for the image at `uri` plus the geometry needed to map boxes back.
    pub fn prepare(&self, uri: &str) -> Result<(Tensor, Letterbox)> {
        let image = imaging::load_image(uri)?;
        let (pixels, geometry) = {
            let mut surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
            imaging::letterbox(&image, &mut surface)?
        };
        let tensor = tensor::encode(&pixels, self.layout, &self.normalization)?;
        Ok((tensor, geometry))
    }
}
