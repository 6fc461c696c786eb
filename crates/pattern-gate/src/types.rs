//! Shared request/context types for the gate engine and the layered
//! pipeline built on top of it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of content a single validation call is looking at. Distinct from
/// [`policy_core::ValidationMode`], which tracks the Input/Output/Generic
/// axis of the decision — this tracks what the content physically *is*,
/// since action plans and actions get extra pattern families that plain
/// text input/output does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Free-form user or agent text.
    Text,
    /// A single proposed action (tool call, transaction, command).
    Action,
    /// A multi-step plan composed of several actions.
    ActionPlan,
}

/// Arbitrary key/value context attached to a validation call, threaded
/// through to pattern evaluation and the audit trail. Kept as a generic
/// bag rather than a fixed struct since callers (transaction guard,
/// database guard, agent frameworks) each want different fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationContext {
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl ValidationContext {
    pub fn new() -> Self {
        ValidationContext::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

/// A single step of an action plan, as seen by [`crate::engine::GateEngine::evaluate_action_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub description: String,
    pub context: ValidationContext,
}

impl PlannedAction {
    pub fn new(description: impl Into<String>) -> Self {
        PlannedAction {
            description: description.into(),
            context: ValidationContext::new(),
        }
    }
}
