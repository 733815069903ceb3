//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, save_config};
pub use paths::{config_dir, config_file_path, default_cache_dir};
pub use types::{CacheConfig, ClassificationConfig, Config, DetectionConfig, InferenceConfig};
pub use validate::validate_config;
