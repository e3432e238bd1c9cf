//! Action kinds
//!
//! One unit of the compiled graph is an action: a table (table, view, or
//! incremental table), an assertion, a raw operation, or a declaration of a
//! pre-existing dataset. Every action carries two target identities: the
//! canonical target derived from its definition file's stem, and the
//! effective target used in the final graph, which configuration overrides
//! may change.

mod assertion;
mod declaration;
mod operation;
mod table;

pub use assertion::Assertion;
pub use declaration::Declaration;
pub use operation::Operation;
pub use table::{Table, TableKind};

use strata_core::Target;

use crate::rewrite::RewriteMap;

/// One compiled action of any kind
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Table(Table),
    Assertion(Assertion),
    Operation(Operation),
    Declaration(Declaration),
}

impl Action {
    /// Effective target used in the final graph
    pub fn target(&self) -> &Target {
        match self {
            Self::Table(a) => &a.target,
            Self::Assertion(a) => &a.target,
            Self::Operation(a) => &a.target,
            Self::Declaration(a) => &a.target,
        }
    }

    /// Canonical target derived from the definition file's stem
    pub fn canonical_target(&self) -> &Target {
        match self {
            Self::Table(a) => &a.canonical_target,
            Self::Assertion(a) => &a.canonical_target,
            Self::Operation(a) => &a.canonical_target,
            Self::Declaration(a) => &a.canonical_target,
        }
    }

    /// Project-relative path of the definition file
    pub fn file(&self) -> &str {
        match self {
            Self::Table(a) => &a.file,
            Self::Assertion(a) => &a.file,
            Self::Operation(a) => &a.file,
            Self::Declaration(a) => &a.file,
        }
    }

    /// Targets this action depends on. Declarations never have any.
    pub fn dependency_targets(&self) -> &[Target] {
        match self {
            Self::Table(a) => &a.dependency_targets,
            Self::Assertion(a) => &a.dependency_targets,
            Self::Operation(a) => &a.dependency_targets,
            Self::Declaration(_) => &[],
        }
    }

    pub fn dependency_targets_mut(&mut self) -> Option<&mut Vec<Target>> {
        match self {
            Self::Table(a) => Some(&mut a.dependency_targets),
            Self::Assertion(a) => Some(&mut a.dependency_targets),
            Self::Operation(a) => Some(&mut a.dependency_targets),
            Self::Declaration(_) => None,
        }
    }

    /// Targets recorded by `ref` calls while this action's SQL rendered
    pub fn referenced_targets(&self) -> &[Target] {
        match self {
            Self::Table(a) => &a.referenced_targets,
            Self::Assertion(a) => &a.referenced_targets,
            Self::Operation(a) => &a.referenced_targets,
            Self::Declaration(_) => &[],
        }
    }

    pub fn referenced_targets_mut(&mut self) -> Option<&mut Vec<Target>> {
        match self {
            Self::Table(a) => Some(&mut a.referenced_targets),
            Self::Assertion(a) => Some(&mut a.referenced_targets),
            Self::Operation(a) => Some(&mut a.referenced_targets),
            Self::Declaration(_) => None,
        }
    }

    /// Rewrite embedded reference tokens in this action's SQL text
    pub fn clean_refs(&mut self, rewrites: &RewriteMap) {
        if rewrites.is_empty() {
            return;
        }
        match self {
            Self::Table(a) => a.clean_refs(rewrites),
            Self::Assertion(a) => a.clean_refs(rewrites),
            Self::Operation(a) => a.clean_refs(rewrites),
            Self::Declaration(_) => {}
        }
    }

    /// Kind label used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Table(a) => a.kind.as_str(),
            Self::Assertion(_) => "assertion",
            Self::Operation(_) => "operation",
            Self::Declaration(_) => "declaration",
        }
    }
}
