//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::condition::ConditionError;

/// Errors the engine raises to its caller.
///
/// Action failures never appear here; they are recorded on the
/// returned [`Execution`](crate::Execution) instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The workflow or step definition is malformed.
    #[error("invalid workflow definition: {0}")]
    Validation(#[from] ValidationError),

    /// No template is registered under this name.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// No workflow has this id.
    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    /// The workflow exists but has been deactivated.
    #[error("workflow {0} is inactive")]
    WorkflowInactive(Uuid),
}

/// Reasons a workflow definition is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The definition carries no `steps` list at all.
    #[error("workflow definition has no 'steps'")]
    MissingSteps,

    #[error("workflow name must not be empty")]
    EmptyName,

    /// A step names an action outside the known action set.
    #[error("step {step}: unknown action '{name}'")]
    UnknownAction { step: usize, name: String },

    /// A step's condition could not be parsed.
    #[error("step {step}: malformed condition '{condition}': {reason}")]
    MalformedCondition {
        step: usize,
        condition: String,
        reason: ConditionError,
    },
}
