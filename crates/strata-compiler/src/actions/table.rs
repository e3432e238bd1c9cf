//! Table actions: tables, views, and incremental tables

use serde::{Deserialize, Serialize};
use strata_core::Target;

use crate::definition::{ColumnDescriptor, WarehouseOptions};
use crate::rewrite::{rewrite_references, RewriteMap};

/// How a table action materializes its query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Rebuilt from scratch on every run
    Table,

    /// A view over the query
    View,

    /// Built once, then extended with new rows on subsequent runs
    Incremental,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Incremental => "incremental",
        }
    }
}

/// A dataset produced by running a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub target: Target,
    pub canonical_target: Target,

    /// Project-relative path of the definition file
    pub file: String,

    pub kind: TableKind,

    /// Rendered main query
    pub query: String,

    /// Incremental tables mirror the main query for incremental runs
    pub incremental_query: Option<String>,

    /// Statements run before the main query
    pub pre_operations: Vec<String>,

    /// Statements run after the main query
    pub post_operations: Vec<String>,

    /// Incremental-run mirrors of the pre/post statements
    pub incremental_pre_operations: Vec<String>,
    pub incremental_post_operations: Vec<String>,

    /// Incremental tables only: ignore full-refresh runs
    pub protected: bool,

    /// Incremental tables only: merge key for applying new rows
    pub unique_key: Vec<String>,

    /// Views only: materialize the view
    pub materialized: bool,

    /// Warehouse-specific options, opaque to the compiler
    pub warehouse: Option<WarehouseOptions>,

    pub description: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub tags: Vec<String>,
    pub disabled: bool,

    pub dependency_targets: Vec<Target>,

    /// Subset of `dependency_targets` recorded by `ref` calls
    #[serde(skip)]
    pub referenced_targets: Vec<Target>,
}

impl Table {
    pub fn is_incremental(&self) -> bool {
        self.kind == TableKind::Incremental
    }

    /// Rewrite embedded reference tokens in every SQL field
    pub fn clean_refs(&mut self, rewrites: &RewriteMap) {
        self.query = rewrite_references(&self.query, rewrites);
        if let Some(query) = &self.incremental_query {
            self.incremental_query = Some(rewrite_references(query, rewrites));
        }
        for statements in [
            &mut self.pre_operations,
            &mut self.post_operations,
            &mut self.incremental_pre_operations,
            &mut self.incremental_post_operations,
        ] {
            for statement in statements.iter_mut() {
                *statement = rewrite_references(statement, rewrites);
            }
        }
    }
}
