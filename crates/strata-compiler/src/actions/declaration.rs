//! Declaration actions
//!
//! A declaration names a dataset that already exists outside the project.
//! It carries no query, no dependencies, and no pre/post operations; it only
//! gives other actions a referenceable target.

use serde::{Deserialize, Serialize};
use strata_core::Target;

use crate::definition::ColumnDescriptor;

/// A pre-existing external dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub target: Target,
    pub canonical_target: Target,

    /// Project-relative path of the definition file
    pub file: String,

    pub description: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub tags: Vec<String>,
    pub disabled: bool,
}
