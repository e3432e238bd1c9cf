//! Warehouse target identification and resolution
//!
//! A target names one warehouse object as a (database, schema, name) triple.
//! Partial references ("name", "schema.name", "database.schema.name") are
//! right-aligned and filled from the project defaults.

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;

/// Identifies a single warehouse object.
///
/// Targets are immutable once constructed. Two targets are equal when their
/// rendered representations are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub database: String,
    pub schema: String,
    pub name: String,
}

/// Error resolving a partial target reference
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("empty target reference")]
    EmptyReference,

    #[error("target reference '{reference}' contains too many segments (at most 3 allowed)")]
    TooManySegments { reference: String },
}

impl Target {
    /// Create a target from its three segments
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Canonical target for an action: project defaults plus the definition
    /// file's stem. Unique per project because file stems collide only by
    /// producing a duplicate registration.
    pub fn for_action(config: &ProjectConfig, name: impl Into<String>) -> Self {
        Self::new(&config.default_database, &config.default_schema, name)
    }

    /// Effective target for an action: canonical segments unless the action
    /// configuration overrides them.
    pub fn with_overrides(
        config: &ProjectConfig,
        name: &str,
        database_override: Option<&str>,
        schema_override: Option<&str>,
        name_override: Option<&str>,
    ) -> Self {
        Self::new(
            database_override.unwrap_or(&config.default_database),
            schema_override.unwrap_or(&config.default_schema),
            name_override.unwrap_or(name),
        )
    }

    /// Resolve a partial reference against the project defaults.
    ///
    /// Segments are right-aligned: the last is always the name, the
    /// second-to-last the schema, the third-to-last the database. Missing
    /// leading segments fall back to the project defaults.
    pub fn resolve(reference: &str, config: &ProjectConfig) -> Result<Self, TargetError> {
        if reference.is_empty() {
            return Err(TargetError::EmptyReference);
        }
        let segments: Vec<&str> = reference.split('.').collect();
        if segments.len() > 3 {
            return Err(TargetError::TooManySegments {
                reference: reference.to_string(),
            });
        }
        let mut segments = segments.into_iter().rev();
        let name = segments.next().unwrap_or_default();
        let schema = segments.next().unwrap_or(&config.default_schema);
        let database = segments.next().unwrap_or(&config.default_database);
        Ok(Self::new(database, schema, name))
    }

    /// Canonical string rendering, `database.schema.name`
    pub fn render(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name)
    }

    /// Backquoted rendering as embedded into SQL text by `ref`
    pub fn quoted(&self) -> String {
        format!("`{}`", self.render())
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.name)
    }
}
