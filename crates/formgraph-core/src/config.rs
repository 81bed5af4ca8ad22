//! Engine configuration loaded from TOML

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{self, is_structural};
use crate::schema::FieldRule;

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "formgraph.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid attribute rule `{name}`: {reason}")]
    InvalidRule { name: String, reason: String },
}

/// Validation limits and dynamic-attribute rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_name_length: usize,
    pub max_description_length: usize,
    /// When false, any RFC 4122 version is accepted for ids.
    pub require_uuid_v4: bool,
    /// Extra rules for caller-defined attributes.
    pub attributes: Vec<FieldRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_name_length: 255,
            max_description_length: 4096,
            require_uuid_v4: true,
            attributes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.check_rules()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            "Loaded config from {} ({} attribute rules)",
            path.display(),
            config.attributes.len()
        );
        Ok(config)
    }

    fn check_rules(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rule in &self.attributes {
            let invalid = |reason: &str| ConfigError::InvalidRule {
                name: rule.name.clone(),
                reason: reason.to_string(),
            };
            if rule.name.is_empty() {
                return Err(invalid("name must not be empty"));
            }
            if is_structural(&rule.name) {
                return Err(invalid("structural fields cannot be redefined"));
            }
            if rule.name == model::TRIGGER {
                return Err(invalid("trigger is a built-in rule"));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(invalid("duplicate rule"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.require_uuid_v4);
    }

    #[test]
    fn test_attribute_rules_parsed() {
        let config = EngineConfig::from_toml_str(
            r#"
max_name_length = 64

[[attributes]]
name = "view_type"
kind = "text"
max_length = 32

[[attributes]]
name = "options"
kind = "list"
items = "text"
"#,
        )
        .unwrap();
        assert_eq!(config.max_name_length, 64);
        assert_eq!(config.attributes.len(), 2);
        assert_eq!(config.attributes[1].items, Some(FieldKind::Text));
    }

    #[test]
    fn test_structural_rule_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
[[attributes]]
name = "name"
kind = "integer"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_nodes = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "require_uuid_v4 = false\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.require_uuid_v4);
    }
}
