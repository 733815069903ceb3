//! Model sessions: provider selection, contract checks and execution.

mod backend;
mod contract;
mod ort_backend;
mod provider;
mod session;

pub use backend::{BackendAttempt, BackendError, ModelSession, SessionFactory, TensorSpec};
pub use contract::{DeclaredContract, ValidatedContract};
pub use ort_backend::{OptimizationLevel, OrtBackend, OrtOptions};
pub use provider::{ExecutionProvider, InferenceDevice, ProviderMetadata, provider_chain};
pub use session::{InferenceOutput, ModelSpec, SessionManager, SessionStatus};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two models the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Whole-image species classifier.
    Classification,
    /// Bird bounding-box detector.
    Detection,
}

impl ModelKind {
    /// Both kinds, in initialization order.
    pub const ALL: [Self; 2] = [Self::Classification, Self::Detection];
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classification => write!(f, "classification"),
            Self::Detection => write!(f, "detection"),
        }
    }
}
