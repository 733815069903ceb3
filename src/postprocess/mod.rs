//! Turning raw model outputs into results.

mod classification;
mod detection;

pub use classification::{Prediction, classify, softmax, top_k};
pub use detection::{DetectionBox, decode_detections, map_to_original};
