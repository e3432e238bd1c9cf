//! Per-file render context
//!
//! One context exists per definition file being rendered. It carries the
//! project defaults used to resolve partial references, the effective target
//! of the action under construction (for `self()`), and a shared sink that
//! `ref()` fills with every target it resolves. The loader threads the
//! context explicitly, so reference attribution never depends on global
//! state.

use std::sync::{Arc, Mutex};

use strata_core::{ProjectConfig, Target};

/// Render context for a single definition file
#[derive(Debug, Clone)]
pub struct RenderContext {
    config: Arc<ProjectConfig>,
    action_target: Target,
    refs: Arc<Mutex<Vec<Target>>>,
}

impl RenderContext {
    /// Create a context for the action with the given effective target
    pub fn new(config: Arc<ProjectConfig>, action_target: Target) -> Self {
        Self {
            config,
            action_target,
            refs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Project configuration used for reference resolution
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Effective target of the action under construction
    pub fn action_target(&self) -> &Target {
        &self.action_target
    }

    /// Record a target resolved by `ref()` during rendering
    pub fn record_ref(&self, target: Target) {
        self.refs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(target);
    }

    /// Every target recorded by `ref()` so far, in call order
    pub fn referenced_targets(&self) -> Vec<Target> {
        self.refs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
