//! Image loading and resizing ahead of tensor encoding.
//!
//! Two resize policies are provided: stretch-to-fit (used by the detector
//! before letterbox padding) and shortest-edge-then-center-crop (used by the
//! classifier). Both draw into a reusable [`Surface`] that is cleared before
//! every draw.

mod buffer;
mod letterbox;
mod resize;
mod source;
mod surface;

pub use buffer::{AlphaMode, PixelBuffer};
pub use letterbox::Letterbox;
pub use resize::{letterbox, shortest_edge_center_crop, stretch_to_fit};
pub use source::{decode_file, ensure_source, load_image, resolve_uri};
pub use surface::Surface;
