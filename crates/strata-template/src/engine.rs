//! Template environment and rendering
//!
//! One `TemplateEngine` exists per compilation. Include files are loaded
//! first: each is stored as a named template and the macros it defines are
//! merged into one flat namespace visible to every definition file. Later
//! include files win on name collision; the collision is logged.
//!
//! Rendering a definition SQL string evaluates it with the merged macro
//! namespace plus `ref`, `self` and `var`, against the explicit per-file
//! render context.

use minijinja::{Environment, ErrorKind};
use regex::Regex;
use std::collections::BTreeMap;

use crate::context::RenderContext;
use strata_core::Target;

/// Error during template loading or rendering
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template error in {file}: {message}")]
    Render { file: String, message: String },

    #[error("invalid include file {file}: {message}")]
    Include { file: String, message: String },
}

/// Template engine holding the include-macro namespace
pub struct TemplateEngine {
    env: Environment<'static>,
    macro_pattern: Regex,
    /// Include templates in load order, with the macro names each defines
    includes: Vec<(String, Vec<String>)>,
    /// Flat macro namespace: macro name to the include file that owns it
    macro_owners: BTreeMap<String, String>,
}

impl TemplateEngine {
    /// Create an engine with the project variables bound to `var()`
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        let mut env = Environment::new();

        env.add_function(
            "var",
            move |name: String, default: Option<String>| -> Result<String, minijinja::Error> {
                match vars.get(&name).cloned().or(default) {
                    Some(value) => Ok(value),
                    None => Err(minijinja::Error::new(
                        ErrorKind::UndefinedError,
                        format!("project variable '{name}' is not defined"),
                    )),
                }
            },
        );

        Self {
            env,
            // Matches the name in `{% macro name(...) %}`, tolerating
            // whitespace control markers.
            macro_pattern: Regex::new(r"\{%-?\s*macro\s+([A-Za-z_][A-Za-z0-9_]*)")
                .expect("macro pattern is valid"),
            includes: Vec::new(),
            macro_owners: BTreeMap::new(),
        }
    }

    /// Load one include file into the macro namespace.
    ///
    /// `name` identifies the file in error messages and must be unique per
    /// compilation (the loader uses the project-relative path). Macros
    /// defined here override same-named macros from earlier include files.
    pub fn add_include(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        let mut macros = Vec::new();
        for captures in self.macro_pattern.captures_iter(source) {
            let macro_name = captures[1].to_string();
            if macros.contains(&macro_name) {
                continue;
            }
            if let Some(previous) = self.macro_owners.get(&macro_name) {
                tracing::warn!(
                    macro_name = macro_name.as_str(),
                    previous_file = previous.as_str(),
                    file = name,
                    "include macro overrides an earlier definition"
                );
            }
            self.macro_owners.insert(macro_name.clone(), name.to_string());
            macros.push(macro_name);
        }

        self.env
            .add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| TemplateError::Include {
                file: name.to_string(),
                message: render_error_message(e),
            })?;

        self.includes.push((name.to_string(), macros));
        Ok(())
    }

    /// Names of all macros currently in the namespace
    pub fn macro_names(&self) -> Vec<&str> {
        self.macro_owners.keys().map(String::as_str).collect()
    }

    /// Render one definition SQL string against the given context.
    ///
    /// `file` labels the template in error messages. Strings without any
    /// template syntax pass through untouched.
    pub fn render(
        &self,
        sql: &str,
        context: &RenderContext,
        file: &str,
    ) -> Result<String, TemplateError> {
        if !has_template_syntax(sql) {
            return Ok(sql.to_string());
        }

        let mut env = self.env.clone();

        let ref_context = context.clone();
        env.add_function(
            "ref",
            move |reference: String| -> Result<String, minijinja::Error> {
                let target = Target::resolve(&reference, ref_context.config())
                    .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
                ref_context.record_ref(target.clone());
                Ok(target.quoted())
            },
        );

        let self_context = context.clone();
        env.add_function("self", move || -> String {
            self_context.action_target().quoted()
        });

        let source = format!("{}{}", self.import_preamble(), sql);
        env.render_named_str(file, &source, minijinja::context! {})
            .map_err(|e| TemplateError::Render {
                file: file.to_string(),
                message: render_error_message(e),
            })
    }

    /// Import statements bringing every include macro into scope.
    ///
    /// Emitted in include load order so that later files shadow earlier
    /// ones. The statements render to nothing, so the SQL text is unchanged.
    fn import_preamble(&self) -> String {
        let mut preamble = String::new();
        for (template, macros) in &self.includes {
            if macros.is_empty() {
                continue;
            }
            preamble.push_str("{% from \"");
            preamble.push_str(template);
            preamble.push_str("\" import ");
            preamble.push_str(&macros.join(", "));
            preamble.push_str(" %}");
        }
        preamble
    }
}

/// Check if a string contains any template syntax
pub fn has_template_syntax(sql: &str) -> bool {
    sql.contains("{{") || sql.contains("{%") || sql.contains("{#")
}

/// Flatten a minijinja error and its causes into one message
fn render_error_message(error: minijinja::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
