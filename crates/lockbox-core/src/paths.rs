use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "lockbox";
pub const APP_NAME: &str = "lockbox";

pub const STORE_FILE_NAME: &str = "passwords.dat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))
}

pub fn data_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join(STORE_FILE_NAME))
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE_NAME))
}
