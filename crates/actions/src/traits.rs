//! The `ActionHandler` trait: the contract every action must fulfil.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{ActionError, ActionKind};

/// Context passed to every handler invocation.
///
/// Lives in this crate so both the engine and handler implementations can
/// import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Workflow the step belongs to.
    pub workflow_id: Uuid,
    /// The run this invocation is part of.
    pub execution_id: Uuid,
    /// Position of the step inside the workflow.
    pub step_index: usize,
    /// The action being performed.
    pub action: ActionKind,
}

/// The core action trait.
///
/// Handlers receive the trigger payload of the run and return a JSON result
/// describing what they did. Failures are reported through [`ActionError`];
/// handlers must not panic.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, payload: &Value, ctx: &ActionContext) -> Result<Value, ActionError>;
}
