//! Collected compilation errors
//!
//! Non-fatal problems found during compilation. They are attached to the
//! compiled graph and surfaced to the caller; compilation continues past
//! them. Structurally fatal conditions (duplicate names, cycles) are typed
//! errors instead and abort the run.

use serde::{Deserialize, Serialize};

/// A compilation error attached to a specific action and file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationError {
    /// Definition file the offending action was loaded from
    pub file: String,

    /// Rendered target of the offending action, when known
    pub target: Option<String>,

    /// Human-readable message
    pub message: String,
}

impl CompilationError {
    /// Create a new compilation error for a file
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            target: None,
            message: message.into(),
        }
    }

    /// Attach the rendered target of the offending action
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl std::fmt::Display for CompilationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} ({}): {}", self.file, target, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}
