//! Readable model asset sources.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Something that can produce the bytes of a bundled model.
pub trait AssetSource: Send + Sync + fmt::Debug {
    /// Human-readable identifier used in logs and errors.
    fn describe(&self) -> String;

    /// Open a fresh reader over the asset bytes.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// Model shipped as a file next to the application.
#[derive(Debug, Clone)]
pub struct FileAsset {
    path: PathBuf,
}

impl FileAsset {
    /// Asset backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the bundled file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AssetSource for FileAsset {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// Model compiled into the binary, e.g. with `include_bytes!`.
#[derive(Clone)]
pub struct StaticAsset {
    name: &'static str,
    bytes: &'static [u8],
}

impl StaticAsset {
    /// Asset backed by embedded bytes.
    pub const fn new(name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, bytes }
    }
}

impl fmt::Debug for StaticAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAsset")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AssetSource for StaticAsset {
    fn describe(&self) -> String {
        format!("embedded:{}", self.name)
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.bytes))
    }
}
