//! Project loading
//!
//! Discovers and loads a project from disk: `strata.toml`, then every
//! include file (populating the shared macro namespace), then every
//! definition file in sorted path order. Each definition file is parsed
//! into a typed record, its SQL fields are rendered against a fresh
//! per-file render context, and the resulting action is registered with the
//! session.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use strata_core::{ProjectConfig, Target};
use strata_template::{RenderContext, TemplateEngine};

use crate::actions::{Action, Assertion, Declaration, Operation, Table, TableKind};
use crate::definition::{
    ActionConfig, AssertionDefinition, Definition, OperationDefinition, TableDefinition,
};
use crate::error::CompileError;
use crate::graph::CompiledGraph;
use crate::session::Session;

/// Compile the project at `project_dir` into a graph
pub fn compile_project(project_dir: &Path) -> Result<CompiledGraph, CompileError> {
    load_project(project_dir)?.compile()
}

/// Load the project at `project_dir` into a populated session
pub fn load_project(project_dir: &Path) -> Result<Session, CompileError> {
    let config = ProjectConfig::from_file(&project_dir.join("strata.toml"))?;
    let mut session = Session::new(config);
    let mut engine = TemplateEngine::new(session.config().vars.clone());

    for path in detect_files(&project_dir.join("includes"), &["sql"]) {
        let file = relative_path(&path, project_dir);
        tracing::debug!(file = file.as_str(), "loading include");
        let source = read_file(&path)?;
        engine.add_include(&file, &source)?;
    }

    for path in detect_files(&project_dir.join("definitions"), &["toml", "sql"]) {
        load_definition(&mut session, &engine, project_dir, &path)?;
    }

    Ok(session)
}

fn load_definition(
    session: &mut Session,
    engine: &TemplateEngine,
    project_dir: &Path,
    path: &Path,
) -> Result<(), CompileError> {
    let file = relative_path(path, project_dir);
    tracing::debug!(file = file.as_str(), "loading definition");

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source = read_file(path)?;

    // Bare .sql files are shorthand for a table holding the file body.
    let definition = if path.extension().is_some_and(|ext| ext == "sql") {
        Definition::Table(sql_shorthand(source))
    } else {
        Definition::from_toml(&source).map_err(|e| CompileError::InvalidDefinition {
            file: file.clone(),
            message: e.to_string(),
        })?
    };

    let config = session.config();
    let action_config = definition.config();
    let canonical_target = Target::for_action(config, &stem);
    let target = Target::with_overrides(
        config,
        &stem,
        action_config.database.as_deref(),
        action_config.schema.as_deref(),
        action_config.name.as_deref(),
    );

    let explicit_dependencies = resolve_dependencies(action_config, config, &file)?;
    let context = RenderContext::new(session.config_handle(), target.clone());

    match definition {
        Definition::Table(def) => {
            let (table, assertions) = build_table(
                TableKind::Table, def, target, canonical_target, &file, path,
                explicit_dependencies, engine, &context,
            )?;
            session.register_table(table, assertions.as_ref())
        }
        Definition::View(def) => {
            let (table, assertions) = build_table(
                TableKind::View, def, target, canonical_target, &file, path,
                explicit_dependencies, engine, &context,
            )?;
            session.register_table(table, assertions.as_ref())
        }
        Definition::Incremental(def) => {
            let (table, assertions) = build_table(
                TableKind::Incremental, def, target, canonical_target, &file, path,
                explicit_dependencies, engine, &context,
            )?;
            session.register_table(table, assertions.as_ref())
        }
        Definition::Assertion(def) => {
            let assertion = build_assertion(
                def, target, canonical_target, &file, path,
                explicit_dependencies, engine, &context,
            )?;
            session.register(Action::Assertion(assertion))
        }
        Definition::Operation(def) => {
            let operation = build_operation(
                def, target, canonical_target, &file,
                explicit_dependencies, engine, &context,
            )?;
            session.register(Action::Operation(operation))
        }
        Definition::Declaration(def) => session.register(Action::Declaration(Declaration {
            target,
            canonical_target,
            file,
            description: def.config.description,
            columns: def.config.columns,
            tags: def.config.tags,
            disabled: def.config.disabled,
        })),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_table(
    kind: TableKind,
    def: TableDefinition,
    target: Target,
    canonical_target: Target,
    file: &str,
    path: &Path,
    explicit_dependencies: Vec<Target>,
    engine: &TemplateEngine,
    context: &RenderContext,
) -> Result<(Table, Option<crate::definition::TableAssertions>), CompileError> {
    let raw_query = take_query(def.query, def.query_file, path, file)?;
    let query = engine.render(&raw_query, context, file)?;

    let mut pre_operations = Vec::with_capacity(def.pre_operations.len());
    for statement in &def.pre_operations {
        pre_operations.push(engine.render(statement, context, file)?);
    }
    let mut post_operations = Vec::with_capacity(def.post_operations.len());
    for statement in &def.post_operations {
        post_operations.push(engine.render(statement, context, file)?);
    }

    let incremental = kind == TableKind::Incremental;
    let referenced_targets = context.referenced_targets();
    let dependency_targets = merge_dependencies(explicit_dependencies, &referenced_targets);

    let table = Table {
        target,
        canonical_target,
        file: file.to_string(),
        kind,
        incremental_query: incremental.then(|| query.clone()),
        incremental_pre_operations: if incremental { pre_operations.clone() } else { vec![] },
        incremental_post_operations: if incremental { post_operations.clone() } else { vec![] },
        query,
        pre_operations,
        post_operations,
        protected: def.protected,
        unique_key: def.unique_key.unwrap_or_default(),
        materialized: def.materialized,
        warehouse: def.warehouse,
        description: def.config.description,
        columns: def.config.columns,
        tags: def.config.tags,
        disabled: def.config.disabled,
        dependency_targets,
        referenced_targets,
    };
    Ok((table, def.assertions))
}

#[allow(clippy::too_many_arguments)]
fn build_assertion(
    def: AssertionDefinition,
    target: Target,
    canonical_target: Target,
    file: &str,
    path: &Path,
    explicit_dependencies: Vec<Target>,
    engine: &TemplateEngine,
    context: &RenderContext,
) -> Result<Assertion, CompileError> {
    let raw_query = take_query(def.query, def.query_file, path, file)?;
    let query = engine.render(&raw_query, context, file)?;

    let referenced_targets = context.referenced_targets();
    let dependency_targets = merge_dependencies(explicit_dependencies, &referenced_targets);

    Ok(Assertion {
        target,
        canonical_target,
        file: file.to_string(),
        query,
        description: def.config.description,
        tags: def.config.tags,
        disabled: def.config.disabled,
        dependency_targets,
        referenced_targets,
    })
}

fn build_operation(
    def: OperationDefinition,
    target: Target,
    canonical_target: Target,
    file: &str,
    explicit_dependencies: Vec<Target>,
    engine: &TemplateEngine,
    context: &RenderContext,
) -> Result<Operation, CompileError> {
    let mut queries = Vec::with_capacity(def.queries.len());
    for statement in &def.queries {
        queries.push(engine.render(statement, context, file)?);
    }

    let referenced_targets = context.referenced_targets();
    let dependency_targets = merge_dependencies(explicit_dependencies, &referenced_targets);

    Ok(Operation {
        target,
        canonical_target,
        file: file.to_string(),
        queries,
        has_output: def.has_output,
        description: def.config.description,
        columns: def.config.columns,
        tags: def.config.tags,
        disabled: def.config.disabled,
        dependency_targets,
        referenced_targets,
    })
}

/// A bare .sql definition: a table whose query is the whole file body
fn sql_shorthand(source: String) -> TableDefinition {
    TableDefinition {
        config: ActionConfig::default(),
        query: Some(source),
        query_file: None,
        pre_operations: vec![],
        post_operations: vec![],
        protected: false,
        unique_key: None,
        materialized: false,
        assertions: None,
        warehouse: None,
    }
}

/// Resolve the explicit `dependencies` entries of a definition
fn resolve_dependencies(
    config: &ActionConfig,
    project: &ProjectConfig,
    file: &str,
) -> Result<Vec<Target>, CompileError> {
    config
        .dependencies
        .iter()
        .map(|reference| {
            Target::resolve(reference, project).map_err(|e| CompileError::InvalidDefinition {
                file: file.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Explicit dependencies first, then everything `ref` recorded
fn merge_dependencies(explicit: Vec<Target>, referenced: &[Target]) -> Vec<Target> {
    let mut dependencies = explicit;
    dependencies.extend(referenced.iter().cloned());
    dependencies
}

/// The definition's query text: inline `query`, or the contents of
/// `query_file` resolved relative to the definition file
fn take_query(
    query: Option<String>,
    query_file: Option<String>,
    path: &Path,
    file: &str,
) -> Result<String, CompileError> {
    match (query, query_file) {
        (Some(_), Some(_)) => Err(CompileError::InvalidDefinition {
            file: file.to_string(),
            message: "sets both 'query' and 'query_file'; specify exactly one".to_string(),
        }),
        (Some(query), None) => Ok(query),
        (None, Some(query_file)) => {
            let sql_path = path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&query_file);
            read_file(&sql_path)
        }
        (None, None) => Err(CompileError::InvalidDefinition {
            file: file.to_string(),
            message: "missing 'query' (or 'query_file')".to_string(),
        }),
    }
}

/// All files under `dir` with one of the given extensions, sorted by path
/// for deterministic load order
fn detect_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

fn relative_path(path: &Path, project_dir: &Path) -> String {
    path.strip_prefix(project_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn read_file(path: &Path) -> Result<String, CompileError> {
    std::fs::read_to_string(path).map_err(|e| CompileError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
