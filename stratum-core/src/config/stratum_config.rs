//! Top-level Stratum configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StorageConfig;
use crate::errors::ConfigError;

/// Top-level configuration.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`STRATUM_*`)
/// 2. Project config (`stratum.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StratumConfig {
    pub storage: StorageConfig,
}

impl StratumConfig {
    /// Load configuration with layered resolution.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join("stratum.toml");
        if project_config_path.exists() {
            let content = std::fs::read_to_string(&project_config_path).map_err(|_| {
                ConfigError::FileNotFound {
                    path: project_config_path.display().to_string(),
                }
            })?;
            config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: project_config_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(config: &mut StratumConfig) {
        if let Ok(root) = std::env::var("STRATUM_STORAGE_ROOT") {
            if !root.is_empty() {
                config.storage.root = root.into();
            }
        }
        if let Ok(name) = std::env::var("STRATUM_XREPO_FILENAME") {
            if !name.is_empty() {
                config.storage.xrepo_filename = name;
            }
        }
    }

    /// Validate the final configuration values.
    pub fn validate(config: &StratumConfig) -> Result<(), ConfigError> {
        if config.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "storage.root".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if config.storage.xrepo_filename.is_empty()
            || config.storage.xrepo_filename.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ConfigError::ValidationFailed {
                field: "storage.xrepo_filename".to_string(),
                message: "must be a bare filename".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StratumConfig::default();
        assert!(StratumConfig::validate(&config).is_ok());
        assert_eq!(config.storage.xrepo_path(), Path::new(".stratum/xrepo.db"));
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let config = StratumConfig::from_toml(
            r#"
            [storage]
            root = "/var/lib/stratum"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.root, Path::new("/var/lib/stratum"));
        assert_eq!(config.storage.xrepo_filename, "xrepo.db");
    }

    #[test]
    fn rejects_pathy_xrepo_filename() {
        let config = StratumConfig::from_toml(
            r#"
            [storage]
            xrepo_filename = "nested/xrepo.db"
            "#,
        )
        .unwrap();
        assert!(StratumConfig::validate(&config).is_err());
    }
}
