//! Float tensors and the pixel-to-tensor encoder.

mod encoder;
mod types;

pub use encoder::encode;
pub use types::{Normalization, Tensor, TensorLayout};
