//! Materializing bundled model assets into a local cache directory.
//!
//! The inference runtime can only open models from real filesystem paths,
//! so bundled models are copied into the cache once and reused afterwards.

mod asset;
mod store;

pub use asset::{AssetSource, FileAsset, StaticAsset};
pub use store::ModelCache;
