//! End-to-end classification and detection requests.

mod context;
mod preprocess;
mod request;

pub use context::{ClassificationResult, DetectionResult, InferenceContext, Readiness};
pub use preprocess::{ClassificationPreprocessor, DetectionPreprocessor};
pub use request::{RequestId, RequestTracker};
