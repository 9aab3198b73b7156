use crate::generator::PasswordPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockboxSettings {
    /// Store file used when no path is given on the command line.
    pub store_path: Option<PathBuf>,
    pub generator: PasswordPolicy,
    pub save_on_drop: bool,
}

impl Default for LockboxSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            generator: PasswordPolicy::default(),
            save_on_drop: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: LockboxSettings =
            serde_json::from_str(r#"{"generator": {"length": 32}}"#).unwrap();
        assert_eq!(settings.store_path, None);
        assert_eq!(settings.generator.length, 32);
        assert!(settings.generator.include_special);
        assert!(settings.save_on_drop);
    }

    #[test]
    fn empty_object_is_default() {
        let settings: LockboxSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, LockboxSettings::default());
    }
}
