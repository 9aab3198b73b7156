//! Settings persistence. A missing settings file means defaults.

use crate::error::VaultError;
use crate::settings::LockboxSettings;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn load_settings(path: &Path) -> Result<LockboxSettings, VaultError> {
    if !path.exists() {
        return Ok(LockboxSettings::default());
    }
    let data = fs::read(path).map_err(|e| VaultError::file(path, e))?;
    Ok(serde_json::from_slice(&data)?)
}

pub fn save_settings(path: &Path, settings: &LockboxSettings) -> Result<(), VaultError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| VaultError::file(dir, e))?;
    let data = serde_json::to_vec_pretty(settings)?;
    let mut staging = NamedTempFile::new_in(dir).map_err(|e| VaultError::file(dir, e))?;
    staging
        .write_all(&data)
        .map_err(|e| VaultError::file(path, e))?;
    staging
        .persist(path)
        .map_err(|e| VaultError::file(path, e.error))?;
    Ok(())
}
