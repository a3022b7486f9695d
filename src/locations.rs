use directories::BaseDirs;
use std::path::PathBuf;

use crate::errors::{ErrorType, PlaygroundError, Result};

/// `<data dir>/playbox`, created on first use.
pub fn get_main_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| {
        PlaygroundError::new(
            ErrorType::IOError,
            "Could not determine the user's home directory".to_string(),
        )
    })?;
    let package_root = base_dirs.data_dir().join("playbox");
    if !package_root.exists() {
        std::fs::create_dir_all(&package_root)?;
    }
    Ok(package_root)
}

pub fn default_log_dir() -> Result<PathBuf> {
    let log_dir = get_main_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}
