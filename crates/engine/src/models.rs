//! Core domain models for the automation engine.
//!
//! `*Spec` types are the raw, user-facing definitions (what a JSON file or a
//! template carries). They are compiled into [`Workflow`] / [`Step`], whose
//! actions and conditions are already validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use actions::ActionKind;

use crate::condition::Condition;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A step as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Action name, e.g. `send_welcome_email`.
    pub action: String,
    /// Minutes to wait before running the action.
    #[serde(default)]
    pub delay: u64,
    /// Optional `field <op> value` guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Whether a failure aborts the run. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl StepSpec {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            delay: 0,
            condition: None,
            required: None,
        }
    }

    pub fn with_delay(mut self, minutes: u64) -> Self {
        self.delay = minutes;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}

/// An explicit workflow definition, input to `define_workflow`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Event names that start this workflow.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// `None` means the field was absent, which is a validation error.
    #[serde(default)]
    pub steps: Option<Vec<StepSpec>>,
}

/// Field-by-field overrides applied over a template's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub triggers: Option<Vec<String>>,
    pub steps: Option<Vec<StepSpec>>,
}

impl WorkflowOverrides {
    /// Override only the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A validated step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action: ActionKind,
    /// Delay in minutes.
    pub delay: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub required: bool,
}

impl Step {
    /// Validate one raw step; `index` is only used for error reporting.
    pub fn compile(index: usize, spec: &StepSpec) -> Result<Self, ValidationError> {
        let action = spec
            .action
            .parse::<ActionKind>()
            .map_err(|e| ValidationError::UnknownAction {
                step: index,
                name: e.0,
            })?;

        let condition = spec
            .condition
            .as_deref()
            .map(|raw| {
                raw.parse::<Condition>()
                    .map_err(|reason| ValidationError::MalformedCondition {
                        step: index,
                        condition: raw.to_owned(),
                        reason,
                    })
            })
            .transpose()?;

        Ok(Self {
            action,
            delay: spec.delay,
            condition,
            required: spec.required.unwrap_or(true),
        })
    }
}

impl From<&Step> for StepSpec {
    fn from(step: &Step) -> Self {
        Self {
            action: step.action.to_string(),
            delay: step.delay,
            condition: step.condition.as_ref().map(ToString::to_string),
            required: Some(step.required),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Inactive,
}

/// A workflow known to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub triggers: Vec<String>,
    pub steps: Vec<Step>,
    pub status: WorkflowStatus,
    /// Key of the template this workflow was instantiated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Number of finished executions, whatever their outcome.
    pub execution_count: u64,
    /// Number of those executions that completed.
    pub completed_count: u64,
    /// `completed_count / execution_count` as a percentage, one decimal.
    pub success_rate: f64,
}

impl Workflow {
    /// Validate `spec` and build a fresh, active workflow.
    ///
    /// # Errors
    /// - [`ValidationError::MissingSteps`] if `steps` is absent.
    /// - [`ValidationError::EmptyName`] if the name is blank.
    /// - Step-level errors from [`Step::compile`].
    pub fn compile(spec: WorkflowSpec) -> Result<Self, ValidationError> {
        let raw_steps = spec.steps.ok_or(ValidationError::MissingSteps)?;
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let steps = raw_steps
            .iter()
            .enumerate()
            .map(|(i, s)| Step::compile(i, s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: spec.description,
            triggers: spec.triggers,
            steps,
            status: WorkflowStatus::Active,
            template: None,
            created_at: Utc::now(),
            execution_count: 0,
            completed_count: 0,
            success_rate: 0.0,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }

    /// Whether `event` is one of this workflow's triggers.
    pub fn responds_to(&self, event: &str) -> bool {
        self.triggers.iter().any(|t| t == event)
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

/// Outcome of one step within an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_index: usize,
    pub action: ActionKind,
    pub status: StepStatus,
    /// Why the step was skipped or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// What the handler returned on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Handler invocations, retries included. Zero for skipped steps.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub fn skipped(step_index: usize, action: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            step_index,
            action,
            status: StepStatus::Skipped,
            reason: Some(reason.into()),
            output: None,
            attempts: 0,
            executed_at: None,
        }
    }
}

/// One run of a workflow against a trigger payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub trigger_payload: Value,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Elapsed run time in milliseconds, delays included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub status: ExecutionStatus,
    pub steps: Vec<StepRecord>,
    /// The failure that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every step failure of the run, fatal or not.
    pub errors: Vec<String>,
}

impl Execution {
    pub(crate) fn start(workflow_id: Uuid, trigger_payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            trigger_payload,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            status: ExecutionStatus::Running,
            steps: Vec::new(),
            error: None,
            errors: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }
}
