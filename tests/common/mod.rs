//! In-memory session backend shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use birdlens::inference::{BackendError, ExecutionProvider, ModelSession, SessionFactory, TensorSpec};
use birdlens::tensor::Tensor;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a fake model looks like and returns.
#[derive(Clone)]
pub struct FakeModel {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
    pub output: Tensor,
}

/// Counters and switches shared between a factory and its sessions.
#[derive(Default)]
pub struct Counters {
    pub creations: AtomicUsize,
    pub runs: AtomicUsize,
    pub failing_runs: AtomicUsize,
    pub reject_all: AtomicBool,
    pub seen_shapes: Mutex<Vec<Vec<usize>>>,
}

/// Session factory keyed by model file name.
pub struct FakeFactory {
    models: HashMap<String, FakeModel>,
    rejected: Vec<ExecutionProvider>,
    create_delay: Duration,
    pub counters: Arc<Counters>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            rejected: Vec::new(),
            create_delay: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_model(mut self, file_name: &str, model: FakeModel) -> Self {
        self.models.insert(file_name.to_string(), model);
        self
    }

    pub fn rejecting(mut self, provider: ExecutionProvider) -> Self {
        self.rejected.push(provider);
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }
}

impl SessionFactory for FakeFactory {
    fn create(
        &self,
        model_path: &Path,
        provider: ExecutionProvider,
    ) -> Result<Box<dyn ModelSession>, BackendError> {
        if self.counters.reject_all.load(Ordering::SeqCst) || self.rejected.contains(&provider) {
            return Err(BackendError::new(format!("{} unavailable", provider.id())));
        }

        let name = model_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let model = self
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::new(format!("unknown model {name}")))?;

        std::thread::sleep(self.create_delay);
        self.counters.creations.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            model,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    model: FakeModel,
    counters: Arc<Counters>,
}

impl ModelSession for FakeSession {
    fn inputs(&self) -> &[TensorSpec] {
        &self.model.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.model.outputs
    }

    fn run(
        &mut self,
        _input_name: &str,
        input: Tensor,
        _output_name: &str,
    ) -> Result<Tensor, BackendError> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        self.counters
            .seen_shapes
            .lock()
            .unwrap()
            .push(input.shape().to_vec());

        let failing = self.counters.failing_runs.load(Ordering::SeqCst);
        if failing > 0 {
            self.counters.failing_runs.store(failing - 1, Ordering::SeqCst);
            return Err(BackendError::new("simulated runtime failure"));
        }
        Ok(self.model.output.clone())
    }
}

/// Classifier taking `[1, 224, 224, 3]` and returning the given logits.
pub fn classifier(logits: Vec<f32>) -> FakeModel {
    let n = logits.len();
    FakeModel {
        inputs: vec![TensorSpec::new("pixel_values", [1, 224, 224, 3])],
        outputs: vec![TensorSpec::new("logits", [1, i64::try_from(n).unwrap()])],
        output: Tensor::new(vec![1, n], logits).unwrap(),
    }
}

/// Detector taking `[1, 640, 640, 3]` and returning the given 6-float rows.
pub fn detector(rows: Vec<f32>) -> FakeModel {
    let n = rows.len() / 6;
    FakeModel {
        inputs: vec![TensorSpec::new("images", [1, 640, 640, 3])],
        outputs: vec![TensorSpec::new("output0", [1, 300, 6])],
        output: Tensor::new(vec![1, n, 6], rows).unwrap(),
    }
}

/// Write a solid-colour PNG and return its path as a string.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32, rgba: [u8; 4]) -> String {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba(rgba))
        .save(&path)
        .unwrap();
    path.to_string_lossy().into_owned()
}
