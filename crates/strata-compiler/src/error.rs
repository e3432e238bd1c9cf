//! Fatal compilation errors
//!
//! These abort compilation immediately; no partial graph is returned.
//! Problems that leave the rest of the graph valid are collected as
//! [`strata_core::CompilationError`] records on the graph instead.

use strata_core::{ConfigError, TargetError};
use strata_template::TemplateError;

/// Error aborting a compilation
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid definition file {file}: {message}")]
    InvalidDefinition { file: String, message: String },

    #[error("duplicate action '{target}' registered from {file}")]
    DuplicateAction { target: String, file: String },

    #[error(
        "table '{target}' ({file}) sets both 'assertions.unique_key' and \
         'assertions.unique_keys'; specify at most one"
    )]
    ConflictingUniqueKeys { target: String, file: String },

    #[error(
        "missing dependency: action '{action}' ({file}) depends on '{dependency}' \
         which does not exist"
    )]
    MissingDependency {
        action: String,
        file: String,
        dependency: String,
    },

    #[error("circular dependency detected, cycle groups: {}", format_cycle_groups(.groups))]
    CircularDependencies { groups: Vec<Vec<String>> },
}

fn format_cycle_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| format!("[{}]", group.join(" > ")))
        .collect::<Vec<_>>()
        .join(", ")
}
