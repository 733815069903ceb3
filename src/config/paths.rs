//! Platform-specific configuration and cache paths.

use crate::constants::{APP_NAME, CONFIG_FILE_NAME, MODEL_CACHE_SUBDIR};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/birdlens/`
/// - macOS: `~/Library/Application Support/birdlens/`
/// - Windows: `%APPDATA%\birdlens\`
pub fn config_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Default directory for materialized models.
///
/// - Linux: `~/.cache/birdlens/models/`
/// - macOS: `~/Library/Caches/birdlens/models/`
/// - Windows: `%LOCALAPPDATA%\birdlens\cache\models\`
pub fn default_cache_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join(MODEL_CACHE_SUBDIR))
        .ok_or(Error::CacheDirNotFound)
}
