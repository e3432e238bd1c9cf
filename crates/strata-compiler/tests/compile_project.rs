//! End-to-end compilation tests over real project directories

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use strata_compiler::{compile_project, CompileError, CompiledGraph};
use strata_core::Target;

const PROJECT_CONFIG: &str = r#"
default_database = "default_database"
default_schema = "default_schema"
"#;

/// Write a throwaway project: strata.toml plus the given files
fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("strata.toml"), PROJECT_CONFIG).unwrap();
    for (path, contents) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

fn compile(files: &[(&str, &str)]) -> Result<CompiledGraph, CompileError> {
    compile_project(project(files).path())
}

#[test]
fn declaration_and_referencing_table() {
    let graph = compile(&[
        ("definitions/posts_answers.toml", "kind = \"declaration\"\n"),
        (
            "definitions/posts_all.toml",
            r#"
            kind = "table"
            query = "select * from {{ ref('posts_answers') }}"
            "#,
        ),
    ])
    .unwrap();

    assert_eq!(graph.declarations.len(), 1);
    assert_eq!(graph.tables.len(), 1);

    let table = &graph.tables[0];
    assert_eq!(
        table.query,
        "select * from `default_database.default_schema.posts_answers`"
    );
    assert_eq!(
        table.dependency_targets,
        vec![Target::new("default_database", "default_schema", "posts_answers")]
    );
}

#[test]
fn schema_override_rewrites_referencing_sql() {
    let graph = compile(&[
        (
            "definitions/that_table.toml",
            r#"
            kind = "table"
            schema = "custom"
            query = "select 1 as id"
            "#,
        ),
        (
            // Loads before that_table (sorted order), so this exercises the
            // deferred rewrite rather than load-order luck.
            "definitions/report.toml",
            r#"
            kind = "table"
            query = "select * from {{ ref('that_table') }}"
            "#,
        ),
    ])
    .unwrap();

    let report = graph
        .tables
        .iter()
        .find(|t| t.target.name == "report")
        .unwrap();
    assert_eq!(
        report.query,
        "select * from `default_database.custom.that_table`"
    );
    assert_eq!(
        report.dependency_targets,
        vec![Target::new("default_database", "custom", "that_table")]
    );
}

#[test]
fn table_constraints_synthesize_assertions() {
    let graph = compile(&[(
        "definitions/posts.toml",
        r#"
        kind = "table"
        tags = ["nightly"]
        query = "select 1 as id, 'a' as name"

        [assertions]
        unique_key = ["id"]
        non_null = ["id", "name"]
        "#,
    )])
    .unwrap();

    assert_eq!(graph.assertions.len(), 2);

    let unique = graph
        .assertions
        .iter()
        .find(|a| a.target.name == "posts_assertions_unique_key_id")
        .unwrap();
    assert!(unique.query.contains("GROUP BY id"));
    assert!(unique.query.contains("WHERE index_row_count > 1"));
    assert!(unique.query.contains("FROM `default_database.default_schema.posts`"));
    assert_eq!(unique.tags, vec!["nightly"]);
    assert_eq!(
        unique.dependency_targets,
        vec![Target::new("default_database", "default_schema", "posts")]
    );

    let row_conditions = graph
        .assertions
        .iter()
        .find(|a| a.target.name == "posts_assertions_rowConditions")
        .unwrap();
    assert_eq!(row_conditions.query.matches("UNION ALL").count(), 1);
    assert!(row_conditions.query.contains("WHERE NOT (id IS NOT NULL)"));
    assert!(row_conditions.query.contains("WHERE NOT (name IS NOT NULL)"));
    assert!(row_conditions
        .query
        .contains("'id IS NOT NULL' AS failing_row_condition"));
}

#[test]
fn multiple_unique_keys_synthesize_one_assertion_each() {
    let graph = compile(&[(
        "definitions/events.toml",
        r#"
        kind = "table"
        query = "select 1"

        [assertions]
        unique_keys = [["id"], ["user_id", "occurred_at"]]
        "#,
    )])
    .unwrap();

    let names: Vec<&str> = graph
        .assertions
        .iter()
        .map(|a| a.target.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "events_assertions_unique_key_id",
            "events_assertions_unique_key_user_id_occurred_at",
        ]
    );
}

#[test]
fn conflicting_unique_key_forms_abort() {
    let err = compile(&[(
        "definitions/posts.toml",
        r#"
        kind = "table"
        query = "select 1"

        [assertions]
        unique_key = ["id"]
        unique_keys = [["id", "name"]]
        "#,
    )])
    .unwrap_err();

    assert!(matches!(err, CompileError::ConflictingUniqueKeys { .. }));
    assert!(err.to_string().contains("posts"));
}

#[test]
fn sql_file_is_table_shorthand() {
    let graph = compile(&[(
        "definitions/raw_events.sql",
        "select * from {{ ref('source_events') }}",
    ), (
        "definitions/source_events.toml",
        "kind = \"declaration\"\n",
    )])
    .unwrap();

    let table = &graph.tables[0];
    assert_eq!(table.target.name, "raw_events");
    assert_eq!(
        table.query,
        "select * from `default_database.default_schema.source_events`"
    );
}

#[test]
fn query_file_loads_sql_from_disk() {
    let graph = compile(&[
        (
            "definitions/posts.toml",
            r#"
            kind = "table"
            query_file = "posts_body.sql"
            "#,
        ),
        ("definitions/posts_body.sql", "select 42 as answer"),
    ])
    .unwrap();

    // posts_body.sql itself also loads as a shorthand table; the explicit
    // definition and the shorthand are distinct actions.
    let posts = graph
        .tables
        .iter()
        .find(|t| t.target.name == "posts")
        .unwrap();
    assert_eq!(posts.query, "select 42 as answer");
}

#[test]
fn include_macros_are_shared_and_later_files_win() {
    let graph = compile(&[
        (
            "includes/filters.sql",
            "{% macro active_filter() %}status = 'active'{% endmacro %}",
        ),
        (
            "includes/filters_override.sql",
            "{% macro active_filter() %}status in ('active', 'trial'){% endmacro %}",
        ),
        (
            "definitions/active_users.toml",
            r#"
            kind = "table"
            query = "select * from users where {{ active_filter() }}"
            "#,
        ),
    ])
    .unwrap();

    assert_eq!(
        graph.tables[0].query,
        "select * from users where status in ('active', 'trial')"
    );
}

#[test]
fn project_vars_are_available_to_templates() {
    let dir = project(&[(
        "definitions/recent.toml",
        r#"
        kind = "table"
        query = "select * from events where day >= '{{ var('start_date') }}'"
        "#,
    )]);
    fs::write(
        dir.path().join("strata.toml"),
        r#"
        default_database = "default_database"
        default_schema = "default_schema"

        [vars]
        start_date = "2020-01-01"
        "#,
    )
    .unwrap();

    let graph = compile_project(dir.path()).unwrap();
    assert_eq!(
        graph.tables[0].query,
        "select * from events where day >= '2020-01-01'"
    );
}

#[test]
fn self_resolves_to_effective_target() {
    let graph = compile(&[(
        "definitions/maintenance.toml",
        r#"
        kind = "operation"
        has_output = true
        queries = ["create or replace table {{ self() }} as select 1 as id"]
        "#,
    )])
    .unwrap();

    assert_eq!(
        graph.operations[0].queries[0],
        "create or replace table `default_database.default_schema.maintenance` as select 1 as id"
    );
}

#[test]
fn incremental_tables_mirror_query_and_operations() {
    let graph = compile(&[(
        "definitions/events.toml",
        r#"
        kind = "incremental"
        protected = true
        unique_key = ["id"]
        query = "select 1 as id"
        pre_operations = ["delete from staging where true"]
        "#,
    )])
    .unwrap();

    let table = &graph.tables[0];
    assert!(table.is_incremental());
    assert!(table.protected);
    assert_eq!(table.unique_key, vec!["id"]);
    assert_eq!(table.incremental_query.as_deref(), Some("select 1 as id"));
    assert_eq!(table.incremental_pre_operations, table.pre_operations);
}

#[test]
fn duplicate_stems_across_directories_abort() {
    let err = compile(&[
        ("definitions/staging/posts.toml", "kind = \"table\"\nquery = \"select 1\"\n"),
        ("definitions/marts/posts.toml", "kind = \"table\"\nquery = \"select 2\"\n"),
    ])
    .unwrap_err();

    assert!(matches!(err, CompileError::DuplicateAction { target, .. }
        if target == "default_database.default_schema.posts"));
}

#[test]
fn reference_cycles_abort_with_the_full_group() {
    let err = compile(&[
        (
            "definitions/a.toml",
            "kind = \"table\"\nquery = \"select * from {{ ref('b') }}\"\n",
        ),
        (
            "definitions/b.toml",
            "kind = \"table\"\nquery = \"select * from {{ ref('c') }}\"\n",
        ),
        (
            "definitions/c.toml",
            "kind = \"table\"\nquery = \"select * from {{ ref('a') }}\"\n",
        ),
    ])
    .unwrap_err();

    let CompileError::CircularDependencies { groups } = err else {
        panic!("expected a cycle error, got: {err}");
    };
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0],
        vec![
            "default_database.default_schema.a".to_string(),
            "default_database.default_schema.b".to_string(),
            "default_database.default_schema.c".to_string(),
        ]
    );
}

#[test]
fn dangling_reference_aborts() {
    let err = compile(&[(
        "definitions/orphan.toml",
        "kind = \"table\"\nquery = \"select * from {{ ref('never_defined') }}\"\n",
    )])
    .unwrap_err();

    assert!(matches!(err, CompileError::MissingDependency { dependency, .. }
        if dependency == "default_database.default_schema.never_defined"));
}

#[test]
fn empty_reference_aborts() {
    let err = compile(&[(
        "definitions/bad.toml",
        "kind = \"table\"\nquery = \"select * from {{ ref('') }}\"\n",
    )])
    .unwrap_err();

    assert!(err.to_string().contains("empty target reference"));
}

#[test]
fn oversized_reference_aborts() {
    let err = compile(&[(
        "definitions/bad.toml",
        "kind = \"table\"\nquery = \"select * from {{ ref('a.b.c.d') }}\"\n",
    )])
    .unwrap_err();

    assert!(err.to_string().contains("a.b.c.d"));
}

#[test]
fn unrecognized_kind_aborts() {
    let err = compile(&[(
        "definitions/bad.toml",
        "kind = \"snapshot\"\nquery = \"select 1\"\n",
    )])
    .unwrap_err();

    let CompileError::InvalidDefinition { file, .. } = err else {
        panic!("expected an invalid definition error, got: {err}");
    };
    assert_eq!(file, "definitions/bad.toml");
}

#[test]
fn operation_columns_without_output_is_collected_not_fatal() {
    let graph = compile(&[(
        "definitions/cleanup.toml",
        r#"
        kind = "operation"
        queries = ["delete from events where stale"]

        [[columns]]
        path = ["id"]
        description = "identifier"
        "#,
    )])
    .unwrap();

    assert_eq!(graph.operations.len(), 1);
    assert_eq!(graph.graph_errors.len(), 1);
    let error = &graph.graph_errors[0];
    assert_eq!(error.file, "definitions/cleanup.toml");
    assert!(error.message.contains("has_output"));
}

#[test]
fn ref_to_operation_without_output_is_collected() {
    let graph = compile(&[
        (
            "definitions/cleanup.toml",
            "kind = \"operation\"\nqueries = [\"delete from t where true\"]\n",
        ),
        (
            "definitions/report.toml",
            "kind = \"table\"\nquery = \"select * from {{ ref('cleanup') }}\"\n",
        ),
    ])
    .unwrap();

    assert_eq!(graph.graph_errors.len(), 1);
    assert!(graph.graph_errors[0]
        .message
        .contains("default_database.default_schema.cleanup"));
}

#[test]
fn explicit_dependencies_resolve_with_defaults() {
    let graph = compile(&[
        (
            "definitions/base.toml",
            "kind = \"table\"\nquery = \"select 1\"\n",
        ),
        (
            "definitions/dependent.toml",
            r#"
            kind = "operation"
            dependencies = ["base"]
            queries = ["drop table if exists scratch"]
            "#,
        ),
    ])
    .unwrap();

    let dependent = &graph.operations[0];
    assert_eq!(
        dependent.dependency_targets,
        vec![Target::new("default_database", "default_schema", "base")]
    );
}

#[test]
fn graph_serializes_to_json() {
    let graph = compile(&[
        ("definitions/posts_answers.toml", "kind = \"declaration\"\n"),
        (
            "definitions/posts_all.toml",
            "kind = \"table\"\nquery = \"select * from {{ ref('posts_answers') }}\"\n",
        ),
    ])
    .unwrap();

    let json = serde_json::to_string_pretty(&graph).unwrap();
    assert!(json.contains("posts_all"));
    assert!(json.contains("`default_database.default_schema.posts_answers`"));

    let parsed: CompiledGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.action_count(), graph.action_count());
}

#[test]
fn missing_project_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("definitions")).unwrap();
    assert!(compile_project(dir.path()).is_err());
}

#[test]
fn empty_project_compiles_to_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("strata.toml"), PROJECT_CONFIG).unwrap();

    let graph = compile_project(dir.path()).unwrap();
    assert_eq!(graph.action_count(), 0);
    assert!(graph.graph_errors.is_empty());
}

#[test]
fn compiled_file_paths_are_project_relative() {
    let dir = project(&[(
        "definitions/marts/posts.toml",
        "kind = \"table\"\nquery = \"select 1\"\n",
    )]);
    let graph = compile_project(dir.path()).unwrap();
    assert_eq!(
        Path::new(&graph.tables[0].file),
        Path::new("definitions/marts/posts.toml")
    );
}
