//! ONNX Runtime implementation of the session seam.

use super::{BackendError, ExecutionProvider, ModelSession, SessionFactory, TensorSpec};
use crate::tensor::Tensor;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    DirectMLExecutionProvider, ExecutionProviderDispatch,
    NNAPIExecutionProvider, QNNExecutionProvider, XNNPACKExecutionProvider,
};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::ValueType;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::debug;

/// Graph optimization level applied when a session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// No graph rewrites.
    Disable,
    /// Constant folding and redundant node removal.
    Basic,
    /// Basic plus node fusions.
    Extended,
    /// Every available optimization, including layout changes.
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => Self::Disable,
            OptimizationLevel::Basic => Self::Level1,
            OptimizationLevel::Extended => Self::Level2,
            OptimizationLevel::All => Self::Level3,
        }
    }
}

/// Session builder options shared by every model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrtOptions {
    /// Intra-op thread count; 0 lets the runtime decide.
    pub intra_threads: usize,
    /// Graph optimization level.
    pub optimization: OptimizationLevel,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            intra_threads: 0,
            optimization: OptimizationLevel::All,
        }
    }
}

/// Builds ONNX Runtime sessions pinned to a single execution provider.
#[derive(Debug, Clone, Default)]
pub struct OrtBackend {
    options: OrtOptions,
}

impl OrtBackend {
    /// Backend with the given builder options.
    pub fn new(options: OrtOptions) -> Self {
        Self { options }
    }

    fn build(
        &self,
        model_path: &Path,
        provider: ExecutionProvider,
    ) -> Result<Session, BackendError> {
        let mut builder = Session::builder()
            .map_err(BackendError::from_display)?
            .with_optimization_level(self.options.optimization.into())
            .map_err(BackendError::from_display)?;

        if self.options.intra_threads > 0 {
            builder = builder
                .with_intra_threads(self.options.intra_threads)
                .map_err(BackendError::from_display)?;
        }

        // CPU needs no registration. Any other provider that fails to
        // register fails this attempt.
        if provider != ExecutionProvider::Cpu {
            builder = builder
                .with_execution_providers([dispatch(provider)?])
                .map_err(BackendError::from_display)?;
        }

        builder
            .commit_from_file(model_path)
            .map_err(BackendError::from_display)
    }
}

fn checked<E>(ep: E, provider: ExecutionProvider) -> Result<ExecutionProviderDispatch, BackendError>
where
    E: ort::execution_providers::ExecutionProvider + Into<ExecutionProviderDispatch>,
{
    match ep.is_available() {
        Ok(true) => Ok(ep.into().error_on_failure()),
        Ok(false) => Err(BackendError::new(format!(
            "{} is not available in this ONNX Runtime build",
            provider.metadata().name
        ))),
        Err(e) => Err(BackendError::from_display(e)),
    }
}

fn dispatch(provider: ExecutionProvider) -> Result<ExecutionProviderDispatch, BackendError> {
    match provider {
        ExecutionProvider::Nnapi => checked(NNAPIExecutionProvider::default(), provider),
        ExecutionProvider::CoreMl => checked(CoreMLExecutionProvider::default(), provider),
        ExecutionProvider::Qnn => checked(QNNExecutionProvider::default(), provider),
        ExecutionProvider::Xnnpack => checked(XNNPACKExecutionProvider::default(), provider),
        ExecutionProvider::Cuda => checked(CUDAExecutionProvider::default(), provider),
        ExecutionProvider::DirectMl => checked(DirectMLExecutionProvider::default(), provider),
        ExecutionProvider::Cpu => checked(CPUExecutionProvider::default(), provider),
    }
}

fn tensor_dims(value_type: &ValueType) -> Vec<i64> {
    match value_type {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        _ => Vec::new(),
    }
}

impl SessionFactory for OrtBackend {
    fn create(
        &self,
        model_path: &Path,
        provider: ExecutionProvider,
    ) -> Result<Box<dyn ModelSession>, BackendError> {
        // Some provider plugins abort by panicking instead of returning an error.
        let session = catch_unwind(AssertUnwindSafe(|| self.build(model_path, provider)))
            .map_err(|_| BackendError::new("ONNX Runtime panicked while building session"))??;

        let inputs = session
            .inputs
            .iter()
            .map(|i| TensorSpec::new(i.name.clone(), tensor_dims(&i.input_type)))
            .collect();
        let outputs = session
            .outputs
            .iter()
            .map(|o| TensorSpec::new(o.name.clone(), tensor_dims(&o.output_type)))
            .collect();

        debug!(
            "Built session for {} on {}",
            model_path.display(),
            provider.id()
        );
        Ok(Box::new(OrtSession {
            session,
            inputs,
            outputs,
        }))
    }
}

struct OrtSession {
    session: Session,
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
}

impl ModelSession for OrtSession {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    fn run(
        &mut self,
        input_name: &str,
        input: Tensor,
        output_name: &str,
    ) -> Result<Tensor, BackendError> {
        let (shape, data) = input.into_parts();
        let value =
            ort::value::Tensor::from_array((shape, data)).map_err(BackendError::from_display)?;

        let outputs = self
            .session
            .run(ort::inputs![input_name => value])
            .map_err(BackendError::from_display)?;

        let output = outputs
            .get(output_name)
            .ok_or_else(|| BackendError::new(format!("output '{output_name}' missing")))?;
        let (out_shape, out_data) = output
            .try_extract_tensor::<f32>()
            .map_err(BackendError::from_display)?;

        let dims = out_shape
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BackendError::new(format!("output has negative dims {out_shape:?}")))?;

        Tensor::new(dims, out_data.to_vec()).map_err(BackendError::from_display)
    }
}
