//! Strata compiler
//!
//! Compiles a declarative strata project (tables, views, incremental
//! tables, assertions, raw operations, external-source declarations) into a
//! single validated dependency graph: what must be built, in what order,
//! from what SQL, against which warehouse objects. The compiler never
//! executes SQL; it resolves, validates, and emits a graph.

pub mod actions;
pub mod adapter;
pub mod dag;
pub mod definition;
pub mod error;
pub mod graph;
pub mod loader;
pub mod rewrite;
pub mod session;

pub use actions::{Action, Assertion, Declaration, Operation, Table, TableKind};
pub use definition::{
    ActionConfig, AssertionDefinition, ColumnDescriptor, DeclarationDefinition, Definition,
    OperationDefinition, TableAssertions, TableDefinition, WarehouseOptions,
};
pub use error::CompileError;
pub use graph::CompiledGraph;
pub use loader::{compile_project, load_project};
pub use session::Session;
