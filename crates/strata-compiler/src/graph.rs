//! The compiled graph
//!
//! The compiler's single output value: the project configuration plus every
//! compiled action, partitioned by kind, and the collected (non-fatal)
//! compilation errors. Consumers serialize or execute it; the compiler's
//! work ends here.

use serde::{Deserialize, Serialize};
use strata_core::{CompilationError, ProjectConfig};

use crate::actions::{Assertion, Declaration, Operation, Table};

/// A fully compiled, validated project
///
/// Every dependency target in the graph equals the effective target of some
/// action in it; compilation fails before assembly otherwise. Collections
/// are ordered by effective target rendering for stable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledGraph {
    pub project_config: ProjectConfig,

    pub tables: Vec<Table>,
    pub declarations: Vec<Declaration>,
    pub assertions: Vec<Assertion>,
    pub operations: Vec<Operation>,

    /// Collected errors; the graph remains valid and emittable past these
    pub graph_errors: Vec<CompilationError>,
}

impl CompiledGraph {
    /// Total number of actions in the graph
    pub fn action_count(&self) -> usize {
        self.tables.len() + self.declarations.len() + self.assertions.len() + self.operations.len()
    }
}
