//! Application-wide constants.
//!
//! Model geometry and normalization defaults live here so the config layer,
//! the preprocessing stages and the tests agree on one set of numbers.

/// Application name used for config/cache directories and user-facing messages.
pub const APP_NAME: &str = "birdlens";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Subdirectory of the platform cache dir that holds materialized models.
pub const MODEL_CACHE_SUBDIR: &str = "models";

/// Classification model defaults.
pub mod classification {
    /// Cache key (file name) of the bundled classification model.
    pub const CACHE_KEY: &str = "baseQUInt8_quantized_dynamic.onnx";

    /// Square crop fed to the classifier.
    pub const INPUT_SIZE: u32 = 224;

    /// Length of the shorter edge after the first resize, before cropping.
    pub const RESIZE_SHORTER: u32 = 256;

    /// Number of predictions kept in the ranked list.
    pub const DEFAULT_TOP_K: usize = 5;

    /// `ImageNet` per-channel mean (RGB).
    pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

    /// `ImageNet` per-channel standard deviation (RGB).
    pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// Detection model defaults.
pub mod detection {
    /// Cache key (file name) of the bundled detection model.
    pub const CACHE_KEY: &str = "bestfp16_nhwc.onnx";

    /// Square letterbox canvas fed to the detector.
    pub const INPUT_SIZE: u32 = 640;

    /// Default minimum score for a detection to be reported.
    pub const DEFAULT_THRESHOLD: f32 = 0.25;

    /// Floats per candidate row: `x1, y1, x2, y2, score, class_id`.
    pub const ROW_STRIDE: usize = 6;

    /// Candidate rows emitted by the end-to-end YOLO export.
    pub const MAX_DETECTIONS: usize = 300;

    /// Letterbox padding colour (opaque black).
    pub const PAD_COLOR: [u8; 4] = [0, 0, 0, 255];
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}

/// Number of colour channels in an encoded tensor (alpha is dropped).
pub const TENSOR_CHANNELS: usize = 3;

/// Number of channels in a decoded pixel buffer (RGBA).
pub const PIXEL_CHANNELS: usize = 4;
