//! Assertion actions
//!
//! An assertion's query returns the rows violating a constraint; any
//! returned row is a failure. Assertions are user-authored or synthesized
//! from a table's declared constraints.

use serde::{Deserialize, Serialize};
use strata_core::Target;

use crate::rewrite::{rewrite_references, RewriteMap};

/// A constraint check over one or more datasets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    pub target: Target,
    pub canonical_target: Target,

    /// Project-relative path of the definition file; synthesized assertions
    /// carry a path derived from their owning table's file
    pub file: String,

    /// Query whose result rows are constraint violations
    pub query: String,

    pub description: Option<String>,
    pub tags: Vec<String>,
    pub disabled: bool,

    pub dependency_targets: Vec<Target>,

    /// Subset of `dependency_targets` recorded by `ref` calls
    #[serde(skip)]
    pub referenced_targets: Vec<Target>,
}

impl Assertion {
    /// Rewrite embedded reference tokens in the query
    pub fn clean_refs(&mut self, rewrites: &RewriteMap) {
        self.query = rewrite_references(&self.query, rewrites);
    }
}
