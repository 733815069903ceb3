//! Shared inference context.

use super::{ClassificationPreprocessor, DetectionPreprocessor, RequestId, RequestTracker};
use crate::cache::{AssetSource, FileAsset, ModelCache};
use crate::config::{Config, default_cache_dir};
use crate::error::{Error, Result};
use crate::inference::{
    DeclaredContract, ExecutionProvider, ModelKind, ModelSpec, OrtBackend, OrtOptions,
    SessionFactory, SessionManager, SessionStatus, provider_chain,
};
use crate::postprocess::{self, DetectionBox, Prediction};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Outcome of [`InferenceContext::initialize`], one entry per model.
#[derive(Debug)]
pub struct Readiness {
    /// Provider the classifier runs on, or why it failed.
    pub classification: Result<ExecutionProvider>,
    /// Provider the detector runs on, or why it failed.
    pub detection: Result<ExecutionProvider>,
}

impl Readiness {
    /// True when both sessions are ready.
    pub fn all_ready(&self) -> bool {
        self.classification.is_ok() && self.detection.is_ok()
    }
}

/// Species prediction for one image.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    /// Request that produced this result.
    pub request_id: RequestId,
    /// Index of the most probable class.
    pub index: usize,
    /// Probability of that class.
    pub confidence: f32,
    /// Highest-probability classes, best first.
    pub top: Vec<Prediction>,
    /// Time spent in the model.
    #[serde(rename = "inference_ms", serialize_with = "as_millis")]
    pub inference_time: Duration,
}

/// Bird boxes for one image, in original image pixels.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Request that produced this result.
    pub request_id: RequestId,
    /// Boxes with `score >= threshold`, in model order.
    pub boxes: Vec<DetectionBox>,
    /// Width of the decoded source image.
    pub original_width: u32,
    /// Height of the decoded source image.
    pub original_height: u32,
    /// Time spent in the model.
    #[serde(rename = "inference_ms", serialize_with = "as_millis")]
    pub inference_time: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

fn task_err(stage: &'static str) -> impl FnOnce(tokio::task::JoinError) -> Error {
    move |source| Error::TaskJoin { stage, source }
}

/// Owns both model sessions, their preprocessors and the request counter.
///
/// One context is shared across the application; requests may be issued
/// concurrently and each model serializes its own runs.
pub struct InferenceContext {
    sessions: SessionManager,
    classifier: ClassificationPreprocessor,
    detector: DetectionPreprocessor,
    top_k: usize,
    default_threshold: f32,
    row_stride: usize,
    max_detections: usize,
    requests: RequestTracker,
}

impl InferenceContext {
    /// Context backed by ONNX Runtime and the configured model files.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = OrtBackend::new(OrtOptions {
            intra_threads: config.inference.intra_threads,
            optimization: config.inference.optimization,
        });
        Self::new(config, Arc::new(backend))
    }

    /// Context loading the configured model files through `factory`.
    pub fn new(config: &Config, factory: Arc<dyn SessionFactory>) -> Result<Self> {
        Self::with_assets(
            config,
            factory,
            Arc::new(FileAsset::new(&config.classification.asset)),
            Arc::new(FileAsset::new(&config.detection.asset)),
        )
    }

    /// Context with explicit model assets, e.g. models embedded in the binary.
    pub fn with_assets(
        config: &Config,
        factory: Arc<dyn SessionFactory>,
        classification_asset: Arc<dyn AssetSource>,
        detection_asset: Arc<dyn AssetSource>,
    ) -> Result<Self> {
        let cache_dir = match &config.cache.dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };
        let cache = Arc::new(ModelCache::new(cache_dir));

        let providers = provider_chain(
            config.inference.device,
            config.inference.providers.as_deref(),
        );
        debug!(
            "Provider order: {}",
            providers.iter().map(|p| p.id()).collect::<Vec<_>>().join(" → ")
        );

        let c = &config.classification;
        let d = &config.detection;
        let classification = ModelSpec {
            asset: classification_asset,
            cache_key: c.cache_key.clone(),
            sha256: c.sha256.clone(),
            contract: DeclaredContract {
                input_dims: dims(&c.layout.shape(c.input_size as usize, c.input_size as usize)),
                output_dims: vec![1, -1],
            },
        };
        let detection = ModelSpec {
            asset: detection_asset,
            cache_key: d.cache_key.clone(),
            sha256: d.sha256.clone(),
            contract: DeclaredContract {
                input_dims: dims(&d.layout.shape(d.input_size as usize, d.input_size as usize)),
                output_dims: vec![1, -1, i64::try_from(d.row_stride).unwrap_or(-1)],
            },
        };

        Ok(Self {
            sessions: SessionManager::new(factory, cache, providers, classification, detection),
            classifier: ClassificationPreprocessor::new(c),
            detector: DetectionPreprocessor::new(d),
            top_k: c.top_k,
            default_threshold: d.threshold,
            row_stride: d.row_stride,
            max_detections: d.max_detections,
            requests: RequestTracker::new(),
        })
    }

    /// Session lifecycle for both models.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create both sessions concurrently.
    ///
    /// One model failing does not prevent the other from becoming ready.
    pub async fn initialize(&self) -> Readiness {
        let (classification, detection) = tokio::join!(
            self.sessions.create_session(ModelKind::Classification),
            self.sessions.create_session(ModelKind::Detection),
        );
        Readiness {
            classification,
            detection,
        }
    }

    /// True if `id` is still the newest request for `kind`.
    pub fn is_latest(&self, kind: ModelKind, id: RequestId) -> bool {
        self.requests.is_latest(kind, id)
    }

    /// Classify the bird in the image at `uri`.
    pub async fn classify_image(&self, uri: &str) -> Result<ClassificationResult> {
        let request_id = self.requests.begin(ModelKind::Classification);
        self.ensure_ready(ModelKind::Classification)?;

        let preprocessor = self.classifier.clone();
        let owned_uri = uri.to_string();
        let input = tokio::task::spawn_blocking(move || preprocessor.prepare(&owned_uri))
            .await
            .map_err(task_err("classification preprocess"))??;

        let output = self.sessions.run(ModelKind::Classification, input).await?;
        let logits = output.tensor.data();

        let best = postprocess::classify(logits)?;
        let top = postprocess::top_k(logits, self.top_k)?;

        info!(
            "Request {} classified {} as class {} ({:.1}%)",
            request_id,
            uri,
            best.index,
            best.confidence * 100.0
        );
        Ok(ClassificationResult {
            request_id,
            index: best.index,
            confidence: best.confidence,
            top,
            inference_time: output.latency,
        })
    }

    /// Find birds in the image at `uri`.
    ///
    /// `threshold` overrides the configured minimum score.
    pub async fn detect_birds(&self, uri: &str, threshold: Option<f32>) -> Result<DetectionResult> {
        let request_id = self.requests.begin(ModelKind::Detection);
        self.ensure_ready(ModelKind::Detection)?;
        let threshold = threshold.unwrap_or(self.default_threshold);

        let preprocessor = self.detector.clone();
        let owned_uri = uri.to_string();
        let (input, letterbox) = tokio::task::spawn_blocking(move || preprocessor.prepare(&owned_uri))
            .await
            .map_err(task_err("detection preprocess"))??;

        let output = self.sessions.run(ModelKind::Detection, input).await?;

        let raw = postprocess::decode_detections(output.tensor.data(), self.row_stride, threshold)?;
        let mut boxes = postprocess::map_to_original(&raw, &letterbox);
        boxes.truncate(self.max_detections);

        info!(
            "Request {} found {} bird(s) in {} (threshold {:.2})",
            request_id,
            boxes.len(),
            uri,
            threshold
        );
        Ok(DetectionResult {
            request_id,
            boxes,
            original_width: letterbox.original_width(),
            original_height: letterbox.original_height(),
            inference_time: output.latency,
        })
    }

    fn ensure_ready(&self, kind: ModelKind) -> Result<()> {
        match self.sessions.status(kind) {
            SessionStatus::Ready { .. } => Ok(()),
            _ => Err(Error::SessionNotReady { model: kind }),
        }
    }
}

fn dims(shape: &[usize]) -> Vec<i64> {
    shape
        .iter()
        .map(|&d| i64::try_from(d).unwrap_or(-1))
        .collect()
}
