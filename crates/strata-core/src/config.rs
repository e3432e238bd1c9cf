//! Project configuration (strata.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main project configuration structure
///
/// `default_database` and `default_schema` fill the missing leading segments
/// of partial target references. Everything else is passed through to the
/// compiled graph for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Database used when a reference or action does not name one
    pub default_database: String,

    /// Schema used when a reference or action does not name one
    pub default_schema: String,

    /// Warehouse label (e.g. "bigquery"), opaque to the compiler
    #[serde(default)]
    pub warehouse: Option<String>,

    /// Project variables exposed to definition templates via `var(name)`
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl ProjectConfig {
    /// Create a config with the given defaults and no variables
    pub fn new(default_database: impl Into<String>, default_schema: impl Into<String>) -> Self {
        Self {
            default_database: default_database.into(),
            default_schema: default_schema.into(),
            warehouse: None,
            vars: BTreeMap::new(),
            project_root: PathBuf::new(),
        }
    }

    /// Load config from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Project root is the directory holding the config file.
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Parse config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(String, String),

    #[error("invalid project configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = ProjectConfig::from_toml(
            r#"
            default_database = "warehouse"
            default_schema = "analytics"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_database, "warehouse");
        assert_eq!(config.default_schema, "analytics");
        assert!(config.warehouse.is_none());
        assert!(config.vars.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config = ProjectConfig::from_toml(
            r#"
            default_database = "warehouse"
            default_schema = "analytics"
            warehouse = "bigquery"

            [vars]
            start_date = "2020-01-01"
            "#,
        )
        .unwrap();
        assert_eq!(config.warehouse.as_deref(), Some("bigquery"));
        assert_eq!(config.vars.get("start_date").map(String::as_str), Some("2020-01-01"));
    }

    #[test]
    fn missing_defaults_rejected() {
        let result = ProjectConfig::from_toml("default_database = \"warehouse\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
