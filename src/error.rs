//! Error types for birdlens.

use crate::inference::{BackendAttempt, ModelKind};
use std::path::PathBuf;

/// Result type alias for birdlens operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for birdlens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Cache directory could not be determined.
    #[error("could not determine cache directory for this platform")]
    CacheDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Image URI could not be turned into a local path.
    #[error("unsupported image URI '{uri}'")]
    InvalidImageUri {
        /// The rejected URI.
        uri: String,
    },

    /// Image source does not exist.
    #[error("image source not found: {path}")]
    SourceNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Image bytes could not be decoded.
    #[error("failed to decode image '{path}'")]
    DecodeError {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying codec error.
        #[source]
        source: image::ImageError,
    },

    /// Decoded image has a zero dimension.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// Bundled model asset could not be read.
    #[error("model asset '{asset}' is unavailable")]
    AssetUnavailable {
        /// Description of the asset.
        asset: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Writing into the model cache failed.
    #[error("failed to write cached model '{path}'")]
    CacheWrite {
        /// Destination path in the cache.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Cached model content does not match its declared digest.
    #[error("checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Path of the checked file.
        path: PathBuf,
        /// Declared SHA-256 digest.
        expected: String,
        /// Computed SHA-256 digest.
        actual: String,
    },

    /// Every execution backend failed to create a session.
    #[error("failed to create {model} session: {}", format_attempts(.attempts))]
    SessionInitFailed {
        /// Model the session was for.
        model: ModelKind,
        /// One entry per backend tried, in order.
        attempts: Vec<BackendAttempt>,
    },

    /// Loaded model does not expose the declared input/output contract.
    #[error("{model} model does not match its declared contract: {message}")]
    ContractMismatch {
        /// Model that was checked.
        model: ModelKind,
        /// Description of the mismatch.
        message: String,
    },

    /// `run` was called before the session became ready.
    #[error("{model} session is not ready")]
    SessionNotReady {
        /// Model whose session was requested.
        model: ModelKind,
    },

    /// Inference failed inside the runtime.
    #[error("{model} inference failed: {reason}")]
    Inference {
        /// Model that was run.
        model: ModelKind,
        /// Description of the failure.
        reason: String,
    },

    /// Model produced an empty output tensor.
    #[error("model produced an empty output")]
    EmptyOutput,

    /// Output tensor does not have the shape the postprocessor expects.
    #[error("malformed model output: {message}")]
    MalformedOutput {
        /// Description of the problem.
        message: String,
    },

    /// Input to the tensor encoder is inconsistent.
    #[error("invalid tensor input: {message}")]
    InvalidTensor {
        /// Description of the problem.
        message: String,
    },

    /// Failed to read a labels file.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize JSON output.
    #[error("failed to serialize JSON output")]
    JsonSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Blocking worker task did not complete.
    #[error("{stage} worker task failed")]
    TaskJoin {
        /// Pipeline stage that ran on the worker.
        stage: &'static str,
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

fn format_attempts(attempts: &[BackendAttempt]) -> String {
    if attempts.is_empty() {
        return "no execution backends configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.provider.id(), a.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
