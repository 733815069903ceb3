//! Configuration validation.

use crate::config::{ClassificationConfig, Config, DetectionConfig};
use crate::constants::{confidence, detection::ROW_STRIDE};
use crate::error::{Error, Result};

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_classification(&config.classification)?;
    validate_detection(&config.detection)?;
    Ok(())
}

fn validate_sha256(section: &str, digest: Option<&String>) -> Result<()> {
    if let Some(digest) = digest
        && (digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(invalid(format!(
            "{section}.sha256 must be 64 hex characters, got '{digest}'"
        )));
    }
    Ok(())
}

fn validate_cache_key(section: &str, key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(invalid(format!(
            "{section}.cache_key must be a plain file name, got '{key}'"
        )));
    }
    Ok(())
}

fn validate_classification(c: &ClassificationConfig) -> Result<()> {
    validate_cache_key("classification", &c.cache_key)?;
    validate_sha256("classification", c.sha256.as_ref())?;

    if c.input_size == 0 {
        return Err(invalid("classification.input_size must be positive".to_string()));
    }
    if c.resize_shorter < c.input_size {
        return Err(invalid(format!(
            "classification.resize_shorter ({}) must be at least input_size ({})",
            c.resize_shorter, c.input_size
        )));
    }
    if c.top_k == 0 {
        return Err(invalid("classification.top_k must be at least 1".to_string()));
    }
    c.normalization
        .validate()
        .map_err(|e| invalid(format!("classification.normalization: {e}")))
}

fn validate_detection(d: &DetectionConfig) -> Result<()> {
    validate_cache_key("detection", &d.cache_key)?;
    validate_sha256("detection", d.sha256.as_ref())?;

    if d.input_size == 0 {
        return Err(invalid("detection.input_size must be positive".to_string()));
    }
    if !(confidence::MIN..=confidence::MAX).contains(&d.threshold) {
        return Err(invalid(format!(
            "detection.threshold must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            d.threshold
        )));
    }
    if d.row_stride < ROW_STRIDE {
        return Err(invalid(format!(
            "detection.row_stride must be at least {ROW_STRIDE}, got {}",
            d.row_stride
        )));
    }
    if d.max_detections == 0 {
        return Err(invalid("detection.max_detections must be at least 1".to_string()));
    }
    d.normalization
        .validate()
        .map_err(|e| invalid(format!("detection.normalization: {e}")))
}
