//! Compilation session
//!
//! The session owns the action registry for one compilation. Every action,
//! whether loaded from a definition file or synthesized from a table's
//! constraints, enters the graph through [`Session::register`], where duplicate
//! targets are rejected. `compile` runs the post-load passes: the
//! canonical-to-effective reference rewrite, dependency validation, graph
//! assembly, and cycle detection.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use strata_core::{CompilationError, ProjectConfig, Target};

use crate::actions::{Action, Assertion, Table};
use crate::adapter;
use crate::dag;
use crate::definition::TableAssertions;
use crate::error::CompileError;
use crate::graph::CompiledGraph;
use crate::rewrite::RewriteMap;

/// One compilation's registry and collected errors
pub struct Session {
    config: Arc<ProjectConfig>,

    /// Actions keyed by effective target rendering; ordered for
    /// deterministic output
    actions: BTreeMap<String, Action>,

    /// Collected (non-fatal) compilation errors
    errors: Vec<CompilationError>,
}

impl Session {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config: Arc::new(config),
            actions: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Shared handle for render contexts
    pub fn config_handle(&self) -> Arc<ProjectConfig> {
        Arc::clone(&self.config)
    }

    /// Record a collected error; compilation continues
    pub fn report_error(&mut self, error: CompilationError) {
        self.errors.push(error);
    }

    /// Register an action under its effective target rendering.
    ///
    /// The sole mutation point of the registry: a rendering that is already
    /// taken is a fatal duplicate, whatever the kinds involved.
    pub fn register(&mut self, action: Action) -> Result<(), CompileError> {
        let rendering = action.target().render();
        if self.actions.contains_key(&rendering) {
            return Err(CompileError::DuplicateAction {
                target: rendering,
                file: action.file().to_string(),
            });
        }

        if let Action::Operation(operation) = &action {
            if !operation.columns.is_empty() && !operation.has_output {
                self.errors.push(
                    CompilationError::new(
                        &operation.file,
                        "Actions of type 'operation' may only describe columns if they \
                         specify 'has_output: true'.",
                    )
                    .with_target(&rendering),
                );
            }
        }

        tracing::debug!(target_rendering = rendering.as_str(), kind = action.kind_name(), "registered action");
        self.actions.insert(rendering, action);
        Ok(())
    }

    /// Register a table and synthesize the assertions its constraints
    /// declare.
    ///
    /// Synthesis runs after the table record is fully populated, so the
    /// generated queries and dependencies use its effective target.
    /// Synthesized assertions go through [`Session::register`] like any
    /// other action.
    pub fn register_table(
        &mut self,
        table: Table,
        assertions: Option<&TableAssertions>,
    ) -> Result<(), CompileError> {
        let synthesized = match assertions {
            Some(spec) => self.synthesize_assertions(&table, spec)?,
            None => Vec::new(),
        };
        self.register(Action::Table(table))?;
        for assertion in synthesized {
            self.register(Action::Assertion(assertion))?;
        }
        Ok(())
    }

    fn synthesize_assertions(
        &self,
        table: &Table,
        spec: &TableAssertions,
    ) -> Result<Vec<Assertion>, CompileError> {
        if spec.unique_key.is_some() && spec.unique_keys.is_some() {
            return Err(CompileError::ConflictingUniqueKeys {
                target: table.target.render(),
                file: table.file.clone(),
            });
        }

        let unique_keys: Vec<Vec<String>> = match (&spec.unique_key, &spec.unique_keys) {
            (Some(key), None) => vec![key.clone()],
            (None, Some(keys)) => keys.clone(),
            _ => Vec::new(),
        };

        let parent = Path::new(&table.file)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let dataset = table.target.render();
        let mut synthesized = Vec::new();

        for key in &unique_keys {
            let name = format!(
                "{}_assertions_unique_key_{}",
                table.target.name,
                key.join("_")
            );
            synthesized.push(self.inherited_assertion(
                table,
                parent.join(&name).to_string_lossy().into_owned(),
                &name,
                adapter::index_assertion(&dataset, key),
            ));
        }

        let mut merged_conditions = spec.row_conditions.clone().unwrap_or_default();
        if let Some(non_null) = &spec.non_null {
            merged_conditions.extend(non_null.iter().map(|col| format!("{col} IS NOT NULL")));
        }
        if !merged_conditions.is_empty() {
            let stem = Path::new(&table.file)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| table.canonical_target.name.clone());
            let name = format!("{stem}_assertions_rowConditions");
            synthesized.push(self.inherited_assertion(
                table,
                parent.join(&name).to_string_lossy().into_owned(),
                &name,
                adapter::row_conditions_assertion(&dataset, &merged_conditions),
            ));
        }

        Ok(synthesized)
    }

    /// An assertion inheriting the owning table's tags and disabled flag,
    /// depending on its effective target
    fn inherited_assertion(&self, table: &Table, file: String, name: &str, query: String) -> Assertion {
        let target = Target::for_action(&self.config, name);
        Assertion {
            canonical_target: target.clone(),
            target,
            file,
            query,
            description: None,
            tags: table.tags.clone(),
            disabled: table.disabled,
            dependency_targets: vec![table.target.clone()],
            referenced_targets: Vec::new(),
        }
    }

    /// Run the post-load passes and assemble the graph.
    ///
    /// Order matters: the rewrite pass must see the complete registry so
    /// that reference order across files is irrelevant, and cycle detection
    /// is the final gate.
    pub fn compile(mut self) -> Result<CompiledGraph, CompileError> {
        let (rewrites, target_renames) = self.rename_maps();
        tracing::debug!(renamed = target_renames.len(), "running reference rewrite pass");

        for action in self.actions.values_mut() {
            action.clean_refs(&rewrites);

            if let Some(deps) = action.dependency_targets_mut() {
                *deps = remap_targets(deps, &target_renames);
            }
            if let Some(refs) = action.referenced_targets_mut() {
                *refs = remap_targets(refs, &target_renames);
            }
        }

        self.validate_dependencies()?;
        self.check_operation_references();

        let graph = self.assemble();

        let groups = dag::cycle_groups(&dependency_adjacency(&graph));
        if !groups.is_empty() {
            return Err(CompileError::CircularDependencies { groups });
        }

        Ok(graph)
    }

    /// Rewrite pairs for every action whose effective target differs from
    /// its canonical target: quoted renderings for SQL text, plain
    /// renderings for dependency lists.
    fn rename_maps(&self) -> (RewriteMap, BTreeMap<String, Target>) {
        let mut rewrites = RewriteMap::new();
        let mut target_renames = BTreeMap::new();
        for action in self.actions.values() {
            let target = action.target();
            let canonical = action.canonical_target();
            if target != canonical {
                rewrites.insert(canonical.quoted(), target.quoted());
                target_renames.insert(canonical.render(), target.clone());
            }
        }
        (rewrites, target_renames)
    }

    /// Every dependency target must be the effective target of a registered
    /// action. Dangling references cannot be satisfied by any consumer of
    /// the graph, so they are fatal.
    fn validate_dependencies(&self) -> Result<(), CompileError> {
        for action in self.actions.values() {
            for dependency in action.dependency_targets() {
                if !self.actions.contains_key(&dependency.render()) {
                    return Err(CompileError::MissingDependency {
                        action: action.target().render(),
                        file: action.file().to_string(),
                        dependency: dependency.render(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `ref` may only resolve operations that declare an output dataset.
    /// Explicit `dependencies` entries are exempt: they express ordering,
    /// not a referenceable dataset.
    fn check_operation_references(&mut self) {
        let mut resolution_errors = Vec::new();
        for action in self.actions.values() {
            for referenced in action.referenced_targets() {
                if let Some(Action::Operation(operation)) =
                    self.actions.get(&referenced.render())
                {
                    if !operation.has_output {
                        resolution_errors.push(
                            CompilationError::new(
                                action.file(),
                                format!(
                                    "cannot resolve operation '{}': it does not declare \
                                     'has_output: true'",
                                    referenced.render()
                                ),
                            )
                            .with_target(action.target().render()),
                        );
                    }
                }
            }
        }
        self.errors.extend(resolution_errors);
    }

    fn assemble(self) -> CompiledGraph {
        let mut graph = CompiledGraph {
            project_config: (*self.config).clone(),
            tables: Vec::new(),
            declarations: Vec::new(),
            assertions: Vec::new(),
            operations: Vec::new(),
            graph_errors: self.errors,
        };
        for action in self.actions.into_values() {
            match action {
                Action::Table(table) => graph.tables.push(table),
                Action::Declaration(declaration) => graph.declarations.push(declaration),
                Action::Assertion(assertion) => graph.assertions.push(assertion),
                Action::Operation(operation) => graph.operations.push(operation),
            }
        }
        graph
    }
}

/// Remap targets through the rename map and drop duplicates, preserving
/// first-seen order
fn remap_targets(targets: &[Target], renames: &BTreeMap<String, Target>) -> Vec<Target> {
    let mut seen = BTreeSet::new();
    let mut remapped = Vec::new();
    for target in targets {
        let target = renames.get(&target.render()).unwrap_or(target).clone();
        if seen.insert(target.render()) {
            remapped.push(target);
        }
    }
    remapped
}

/// Adjacency over effective renderings for cycle detection.
///
/// Declarations carry no dependencies and cannot participate in cycles, so
/// they contribute no keys.
fn dependency_adjacency(graph: &CompiledGraph) -> BTreeMap<String, Vec<String>> {
    let mut adjacency = BTreeMap::new();
    let renderings = |targets: &[Target]| targets.iter().map(Target::render).collect::<Vec<_>>();
    for table in &graph.tables {
        adjacency.insert(table.target.render(), renderings(&table.dependency_targets));
    }
    for operation in &graph.operations {
        adjacency.insert(
            operation.target.render(),
            renderings(&operation.dependency_targets),
        );
    }
    for assertion in &graph.assertions {
        adjacency.insert(
            assertion.target.render(),
            renderings(&assertion.dependency_targets),
        );
    }
    adjacency
}
