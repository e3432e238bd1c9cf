//! SQL templating for definition files
//!
//! Definition files carry their SQL as minijinja-templated strings. This
//! crate owns the template environment: the merged include-macro namespace
//! and the `ref`/`self`/`var` functions, evaluated against an explicit
//! per-file render context.

pub mod context;
pub mod engine;

pub use context::RenderContext;
pub use engine::{TemplateEngine, TemplateError};
