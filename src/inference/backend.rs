//! Runtime-agnostic session seam.
//!
//! [`SessionManager`](super::SessionManager) only talks to these traits, so
//! provider fallback and lifecycle logic run the same against ONNX Runtime
//! and against the in-memory fakes used in tests.

use super::ExecutionProvider;
use crate::tensor::Tensor;
use std::path::Path;

/// Error reported by a backend; carries the runtime's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Wrap a runtime message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap anything displayable.
    pub fn from_display(err: impl std::fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

/// One failed attempt to create a session on a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAttempt {
    /// Provider that was tried.
    pub provider: ExecutionProvider,
    /// Why it was rejected.
    pub reason: String,
}

/// Name and dimensions of a model input or output. `-1` marks a dynamic axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    /// Tensor name in the graph.
    pub name: String,
    /// Dimensions, outermost first.
    pub dims: Vec<i64>,
}

impl TensorSpec {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, dims: impl Into<Vec<i64>>) -> Self {
        Self {
            name: name.into(),
            dims: dims.into(),
        }
    }
}

/// Creates sessions for a model file on a specific provider.
pub trait SessionFactory: Send + Sync {
    /// Load `model_path` on `provider`. Fails if the provider is unavailable
    /// or rejects the model.
    fn create(
        &self,
        model_path: &Path,
        provider: ExecutionProvider,
    ) -> Result<Box<dyn ModelSession>, BackendError>;
}

/// A loaded model ready to run.
pub trait ModelSession: Send {
    /// Graph inputs.
    fn inputs(&self) -> &[TensorSpec];

    /// Graph outputs.
    fn outputs(&self) -> &[TensorSpec];

    /// Feed `input` to `input_name` and read back `output_name`.
    fn run(
        &mut self,
        input_name: &str,
        input: Tensor,
        output_name: &str,
    ) -> Result<Tensor, BackendError>;
}
