//! Typed definition-file records
//!
//! A definition file is a TOML record tagged by `kind`. The record is fully
//! typed: union-like choices (the action kind, unique-key forms) are tagged
//! variants or explicit optionals validated at construction time, never
//! presence-checked dynamic maps. SQL-valued fields hold templated strings
//! that the loader renders before the action is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed definition file
///
/// The `kind` field selects the action the file defines. An unrecognized
/// kind fails deserialization, which the loader reports as a fatal error.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Definition {
    Table(TableDefinition),
    View(TableDefinition),
    Incremental(TableDefinition),
    Assertion(AssertionDefinition),
    Operation(OperationDefinition),
    Declaration(DeclarationDefinition),
}

impl Definition {
    /// Parse a definition from TOML source
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// The shared configuration record of any definition
    pub fn config(&self) -> &ActionConfig {
        match self {
            Self::Table(def) | Self::View(def) | Self::Incremental(def) => &def.config,
            Self::Assertion(def) => &def.config,
            Self::Operation(def) => &def.config,
            Self::Declaration(def) => &def.config,
        }
    }
}

/// Configuration fields shared by every action kind
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfig {
    /// Database override; project default when absent
    pub database: Option<String>,

    /// Schema override; project default when absent
    pub schema: Option<String>,

    /// Name override; definition file stem when absent
    pub name: Option<String>,

    /// Description of the output dataset
    pub description: Option<String>,

    /// Documentation for columns (and nested fields) of the output dataset
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,

    /// User-defined tags the action should be labeled with
    #[serde(default)]
    pub tags: Vec<String>,

    /// Explicit dependencies, as partial target references
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Disabled actions are compiled but marked not to be executed
    #[serde(default)]
    pub disabled: bool,
}

/// Documentation for one column, addressed by path for nested fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub path: Vec<String>,
    pub description: Option<String>,
}

/// Definition of a table, view, or incremental table
#[derive(Debug, Clone, Deserialize)]
pub struct TableDefinition {
    #[serde(flatten)]
    pub config: ActionConfig,

    /// Templated main query; mutually exclusive with `query_file`
    pub query: Option<String>,

    /// Path to a SQL file holding the main query, relative to the
    /// definition file
    pub query_file: Option<String>,

    /// Statements run before the main query
    #[serde(default)]
    pub pre_operations: Vec<String>,

    /// Statements run after the main query
    #[serde(default)]
    pub post_operations: Vec<String>,

    /// Incremental tables only: ignore full-refresh runs
    #[serde(default)]
    pub protected: bool,

    /// Incremental tables only: merge key for applying new rows
    pub unique_key: Option<Vec<String>>,

    /// Views only: materialize the view
    #[serde(default)]
    pub materialized: bool,

    /// Constraints from which assertion actions are synthesized
    pub assertions: Option<TableAssertions>,

    /// Warehouse-specific options, passed through to the graph
    pub warehouse: Option<WarehouseOptions>,
}

/// Constraints a table declares about itself.
///
/// `unique_key` and `unique_keys` are mutually exclusive; setting both is a
/// fatal configuration error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableAssertions {
    /// Columns constituting the dataset's unique key
    pub unique_key: Option<Vec<String>>,

    /// Column combinations, each constituting a unique key
    pub unique_keys: Option<Vec<Vec<String>>>,

    /// Columns which may never be NULL
    pub non_null: Option<Vec<String>>,

    /// Conditions which must hold for every row
    pub row_conditions: Option<Vec<String>>,
}

/// Warehouse-specific table options.
///
/// Opaque to the compiler; carried into the graph for executors that
/// understand them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseOptions {
    /// Partitioning key, typically a timestamp or date column
    pub partition_by: Option<String>,

    /// Clustering keys within partitions
    #[serde(default)]
    pub cluster_by: Vec<String>,

    /// Filter applied when incremental updates run
    pub update_partition_filter: Option<String>,

    /// Labels attached to the output dataset
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// How long each partition is retained, in days
    pub partition_expiration_days: Option<u32>,

    /// Require queries to filter on the partitioning column
    pub require_partition_filter: Option<bool>,

    /// Free-form option list for hookable executors
    #[serde(default)]
    pub additional_options: BTreeMap<String, String>,
}

/// Definition of a user-authored assertion
#[derive(Debug, Clone, Deserialize)]
pub struct AssertionDefinition {
    #[serde(flatten)]
    pub config: ActionConfig,

    /// Templated query whose result rows are constraint violations
    pub query: Option<String>,

    /// Path to a SQL file holding the query, relative to the definition file
    pub query_file: Option<String>,
}

/// Definition of a raw SQL operation
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDefinition {
    #[serde(flatten)]
    pub config: ActionConfig,

    /// Ordered statements to execute
    #[serde(default)]
    pub queries: Vec<String>,

    /// The operation creates a dataset at its target which `ref` may resolve
    #[serde(default)]
    pub has_output: bool,
}

/// Definition of a pre-existing external dataset
#[derive(Debug, Clone, Deserialize)]
pub struct DeclarationDefinition {
    #[serde(flatten)]
    pub config: ActionConfig,
}
