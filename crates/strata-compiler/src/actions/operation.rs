//! Operation actions
//!
//! An operation is an ordered list of raw SQL statements. Operations do not
//! produce a referenceable dataset unless they declare `has_output`, in
//! which case they must create a dataset at their own target.

use serde::{Deserialize, Serialize};
use strata_core::Target;

use crate::definition::ColumnDescriptor;
use crate::rewrite::{rewrite_references, RewriteMap};

/// A raw sequence of SQL statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub target: Target,
    pub canonical_target: Target,

    /// Project-relative path of the definition file
    pub file: String,

    /// Ordered statements to execute
    pub queries: Vec<String>,

    /// The operation creates a dataset at its target which `ref` may resolve
    pub has_output: bool,

    pub description: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub tags: Vec<String>,
    pub disabled: bool,

    pub dependency_targets: Vec<Target>,

    /// Subset of `dependency_targets` recorded by `ref` calls
    #[serde(skip)]
    pub referenced_targets: Vec<Target>,
}

impl Operation {
    /// Rewrite embedded reference tokens in every statement
    pub fn clean_refs(&mut self, rewrites: &RewriteMap) {
        for query in self.queries.iter_mut() {
            *query = rewrite_references(query, rewrites);
        }
    }
}
