//! Reading and writing the TOML config file.

use crate::config::Config;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Load configuration from `path`, or defaults when the file is absent.
///
/// Sections and keys missing from the file keep their default values.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `config` to `path`, creating parent directories.
///
/// The file is replaced in one rename so a crash never leaves half a config.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let write_err = |source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    let contents = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
