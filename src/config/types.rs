//! Configuration type definitions.

use crate::constants::{classification, detection};
use crate::inference::{ExecutionProvider, InferenceDevice, OptimizationLevel};
use crate::tensor::{Normalization, TensorLayout};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory bundled model assets are read from by default.
const ASSET_DIR: &str = "assets/model";

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model cache settings.
    pub cache: CacheConfig,

    /// Runtime settings shared by both models.
    pub inference: InferenceConfig,

    /// Species classifier.
    pub classification: ClassificationConfig,

    /// Bird detector.
    pub detection: DetectionConfig,
}

/// Model cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory; the platform cache dir when unset.
    pub dir: Option<PathBuf>,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device preference used to derive the provider order.
    pub device: InferenceDevice,

    /// Explicit provider order; overrides `device` when set.
    pub providers: Option<Vec<ExecutionProvider>>,

    /// Intra-op threads; 0 lets the runtime decide.
    pub intra_threads: usize,

    /// Graph optimization level.
    pub optimization: OptimizationLevel,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: InferenceDevice::Auto,
            providers: None,
            intra_threads: 0,
            optimization: OptimizationLevel::All,
        }
    }
}

/// Classification model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Bundled model file.
    pub asset: PathBuf,

    /// File name inside the model cache.
    pub cache_key: String,

    /// Expected SHA-256 of the model, hex encoded.
    pub sha256: Option<String>,

    /// Edge length of the square crop fed to the model.
    pub input_size: u32,

    /// Shorter-edge length after the first resize.
    pub resize_shorter: u32,

    /// Tensor memory order.
    pub layout: TensorLayout,

    /// Pixel normalization.
    pub normalization: Normalization,

    /// Optional class label file, one label per line.
    pub labels: Option<PathBuf>,

    /// Ranked predictions to report.
    pub top_k: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            asset: PathBuf::from(ASSET_DIR).join(classification::CACHE_KEY),
            cache_key: classification::CACHE_KEY.to_string(),
            sha256: None,
            input_size: classification::INPUT_SIZE,
            resize_shorter: classification::RESIZE_SHORTER,
            layout: TensorLayout::Nhwc,
            normalization: Normalization::Standardize {
                mean: classification::IMAGENET_MEAN,
                std: classification::IMAGENET_STD,
            },
            labels: None,
            top_k: classification::DEFAULT_TOP_K,
        }
    }
}

/// Detection model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Bundled model file.
    pub asset: PathBuf,

    /// File name inside the model cache.
    pub cache_key: String,

    /// Expected SHA-256 of the model, hex encoded.
    pub sha256: Option<String>,

    /// Edge length of the square letterbox canvas.
    pub input_size: u32,

    /// Tensor memory order.
    pub layout: TensorLayout,

    /// Pixel normalization.
    pub normalization: Normalization,

    /// Default minimum score.
    pub threshold: f32,

    /// Floats per output row.
    pub row_stride: usize,

    /// Upper bound on reported boxes.
    pub max_detections: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            asset: PathBuf::from(ASSET_DIR).join(detection::CACHE_KEY),
            cache_key: detection::CACHE_KEY.to_string(),
            sha256: None,
            input_size: detection::INPUT_SIZE,
            layout: TensorLayout::Nhwc,
            normalization: Normalization::UnitScale,
            threshold: detection::DEFAULT_THRESHOLD,
            row_stride: detection::ROW_STRIDE,
            max_detections: detection::MAX_DETECTIONS,
        }
    }
}
