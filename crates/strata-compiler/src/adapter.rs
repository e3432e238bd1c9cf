//! Warehouse SQL templating for synthesized assertions
//!
//! Pure functions from (qualified dataset name, column/condition list) to
//! SQL text. Nothing here touches the registry or the graph.

/// Render a string as a SQL string literal.
///
/// Escapes backslashes, then single quotes, then wraps in single quotes.
pub fn sql_string_literal(contents: &str) -> String {
    format!("'{}'", contents.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Query returning every duplicated value group of a unique-key index.
///
/// Groups all rows by the key columns and selects groups holding more than
/// one row; any returned row is a duplicated key.
pub fn index_assertion(dataset: &str, index_cols: &[String]) -> String {
    let columns = index_cols.join(", ");
    format!(
        "\
SELECT
  *
FROM (
  SELECT
    {columns},
    COUNT(1) AS index_row_count
  FROM `{dataset}`
  GROUP BY {columns}
) AS data
WHERE index_row_count > 1
"
    )
}

/// Query returning every row violating any of the given conditions.
///
/// One sub-select per condition, unioned, each violating row tagged with the
/// literal text of the condition it failed so a single result set can
/// distinguish which condition(s) failed.
pub fn row_conditions_assertion(dataset: &str, row_conditions: &[String]) -> String {
    row_conditions
        .iter()
        .map(|condition| {
            format!(
                "\
SELECT
  {} AS failing_row_condition,
  *
FROM `{dataset}`
WHERE NOT ({condition})
",
                sql_string_literal(condition)
            )
        })
        .collect::<Vec<_>>()
        .join("UNION ALL\n")
}
