//! Copy-once model cache.

use super::AssetSource;
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Directory of materialized model files keyed by file name.
///
/// Calls for the same key are serialized, so concurrent first-time requests
/// copy the asset exactly once. A cached file is only ever created by an
/// atomic rename, so a crash mid-copy never leaves a truncated model behind.
#[derive(Debug)]
pub struct ModelCache {
    dir: PathBuf,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModelCache {
    /// Cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `cache_key` lives once materialized.
    pub fn path_for(&self, cache_key: &str) -> Result<PathBuf> {
        validate_key(cache_key)?;
        Ok(self.dir.join(cache_key))
    }

    /// Return a local path for `asset`, copying it into the cache on first use.
    ///
    /// With `expected_sha256`, an existing file whose digest differs is
    /// replaced by a fresh copy, and a fresh copy that still differs is
    /// reported as [`Error::AssetUnavailable`].
    pub async fn ensure_local(
        &self,
        asset: Arc<dyn AssetSource>,
        cache_key: &str,
        expected_sha256: Option<&str>,
    ) -> Result<PathBuf> {
        let target = self.path_for(cache_key)?;
        let key_lock = self.key_lock(cache_key);
        let _guard = key_lock.lock().await;

        let expected = expected_sha256.map(str::to_ascii_lowercase);

        if target.is_file() {
            match expected.clone() {
                None => {
                    debug!("Model cache hit: {}", target.display());
                    return Ok(target);
                }
                Some(digest) => {
                    let path = target.clone();
                    let actual = tokio::task::spawn_blocking(move || file_digest(&path))
                        .await
                        .map_err(|e| Error::TaskJoin {
                            stage: "cache verify",
                            source: e,
                        })??;
                    if actual == digest {
                        debug!("Model cache hit (verified): {}", target.display());
                        return Ok(target);
                    }
                    warn!(
                        "Cached model {} is corrupt (sha256 {}), copying again",
                        target.display(),
                        actual
                    );
                }
            }
        }

        info!("Materializing {} into {}", asset.describe(), target.display());
        let dir = self.dir.clone();
        let dest = target.clone();
        tokio::task::spawn_blocking(move || materialize(asset.as_ref(), &dir, &dest, expected.as_deref()))
            .await
            .map_err(|e| Error::TaskJoin {
                stage: "cache copy",
                source: e,
            })??;

        Ok(target)
    }

    fn key_lock(&self, cache_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(cache_key.to_string()).or_default())
    }
}

/// Cache keys are bare file names.
fn validate_key(cache_key: &str) -> Result<()> {
    let is_plain = !cache_key.is_empty()
        && cache_key != "."
        && cache_key != ".."
        && !cache_key.contains(['/', '\\']);
    if is_plain {
        Ok(())
    } else {
        Err(Error::ConfigValidation {
            message: format!("cache key must be a plain file name, got '{cache_key}'"),
        })
    }
}

fn materialize(
    asset: &dyn AssetSource,
    dir: &Path,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<()> {
    let unavailable = |source: Box<dyn std::error::Error + Send + Sync>| Error::AssetUnavailable {
        asset: asset.describe(),
        source,
    };
    let cache_write = |source: std::io::Error| Error::CacheWrite {
        path: dest.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(cache_write)?;

    let mut reader = asset.open().map_err(|e| unavailable(Box::new(e)))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(cache_write)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(unavailable(Box::new(e))),
        };
        hasher.update(&buf[..n]);
        tmp.write_all(&buf[..n]).map_err(cache_write)?;
        total += n as u64;
    }

    if total == 0 {
        return Err(unavailable("asset is empty".into()));
    }

    if let Some(expected) = expected_sha256 {
        let actual = format!("{:x}", hasher.finalize());
        if actual != expected {
            return Err(unavailable(Box::new(Error::ChecksumMismatch {
                path: dest.to_path_buf(),
                expected: expected.to_string(),
                actual,
            })));
        }
    }

    tmp.as_file().sync_all().map_err(cache_write)?;
    tmp.persist(dest).map_err(|e| cache_write(e.error))?;

    info!("Cached {} ({} bytes)", dest.display(), total);
    Ok(())
}

fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
