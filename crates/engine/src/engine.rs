//! The automation engine: workflow registry, execution history, and the
//! operations callers use to define, run and inspect workflows.
//!
//! One `AutomationEngine` is built per process and shared by reference (or
//! `Arc` when runs should proceed concurrently via [`AutomationEngine::fire_event`]).
//!
//! Workflows and history live behind a single mutex that is never held
//! across an `.await`. A run snapshots its workflow, executes without the
//! lock, then appends its execution and bumps the workflow's counters in one
//! critical section, so concurrent completions of the same workflow cannot
//! interleave their bookkeeping.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use actions::ActionRegistry;

use crate::analytics::{self, AutomationReport, PerformanceAnalysis};
use crate::config::EngineConfig;
use crate::executor::WorkflowExecutor;
use crate::models::{Execution, Workflow, WorkflowOverrides, WorkflowSpec, WorkflowStatus};
use crate::templates::TemplateCatalog;
use crate::EngineError;

#[derive(Default)]
struct EngineState {
    /// In creation order.
    workflows: Vec<Workflow>,
    history: Vec<Execution>,
}

impl EngineState {
    fn workflow_mut(&mut self, id: Uuid) -> Result<&mut Workflow, EngineError> {
        self.workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(EngineError::WorkflowNotFound(id))
    }
}

pub struct AutomationEngine {
    state: Mutex<EngineState>,
    actions: ActionRegistry,
    templates: TemplateCatalog,
    config: EngineConfig,
}

impl AutomationEngine {
    pub fn new(config: EngineConfig, actions: ActionRegistry, templates: TemplateCatalog) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            actions,
            templates,
            config,
        }
    }

    /// Engine with the built-in action stubs and templates.
    pub fn with_builtins(config: EngineConfig) -> Self {
        Self::new(config, ActionRegistry::with_builtins(), TemplateCatalog::builtin())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // No invariant spans a panic point inside the lock, so a poisoned
        // state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Definition
    // -----------------------------------------------------------------------

    /// Validate and register an explicitly defined workflow.
    ///
    /// # Errors
    /// [`EngineError::Validation`] if `steps` is missing, an action is
    /// unknown, or a condition is malformed.
    pub fn define_workflow(&self, spec: WorkflowSpec) -> Result<Workflow, EngineError> {
        let workflow = Workflow::compile(spec)?;
        Ok(self.register(workflow))
    }

    /// Instantiate a catalog template, with `overrides` replacing individual
    /// fields of the template defaults.
    ///
    /// # Errors
    /// [`EngineError::TemplateNotFound`] for an unknown name, or
    /// [`EngineError::Validation`] if overridden steps are malformed.
    pub fn create_from_template(
        &self,
        template_name: &str,
        overrides: WorkflowOverrides,
    ) -> Result<Workflow, EngineError> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| EngineError::TemplateNotFound(template_name.to_owned()))?;

        let mut workflow = Workflow::compile(template.instantiate(overrides))?;
        workflow.template = Some(template_name.to_owned());
        Ok(self.register(workflow))
    }

    fn register(&self, workflow: Workflow) -> Workflow {
        info!(
            workflow_id = %workflow.id,
            name = %workflow.name,
            steps = workflow.steps.len(),
            template = workflow.template.as_deref().unwrap_or("-"),
            "workflow defined"
        );
        self.state().workflows.push(workflow.clone());
        workflow
    }

    pub fn activate(&self, workflow_id: Uuid) -> Result<Workflow, EngineError> {
        self.set_status(workflow_id, WorkflowStatus::Active)
    }

    /// Workflows are never deleted; deactivation stops further runs.
    pub fn deactivate(&self, workflow_id: Uuid) -> Result<Workflow, EngineError> {
        self.set_status(workflow_id, WorkflowStatus::Inactive)
    }

    fn set_status(&self, workflow_id: Uuid, status: WorkflowStatus) -> Result<Workflow, EngineError> {
        let mut state = self.state();
        let workflow = state.workflow_mut(workflow_id)?;
        workflow.status = status;
        info!(%workflow_id, ?status, "workflow status changed");
        Ok(workflow.clone())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn workflow(&self, workflow_id: Uuid) -> Option<Workflow> {
        self.state().workflows.iter().find(|w| w.id == workflow_id).cloned()
    }

    pub fn workflows(&self) -> Vec<Workflow> {
        self.state().workflows.clone()
    }

    /// Every finished execution, oldest first.
    pub fn history(&self) -> Vec<Execution> {
        self.state().history.clone()
    }

    pub fn executions_for(&self, workflow_id: Uuid) -> Vec<Execution> {
        self.state()
            .history
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run a workflow against `payload` and record the outcome.
    ///
    /// Action failures do not surface here; inspect the returned
    /// execution's `status`, `error` and `errors`.
    ///
    /// # Errors
    /// [`EngineError::WorkflowNotFound`] or [`EngineError::WorkflowInactive`].
    #[instrument(skip(self, payload))]
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        payload: Value,
    ) -> Result<Execution, EngineError> {
        let workflow = {
            let state = self.state();
            let workflow = state
                .workflows
                .iter()
                .find(|w| w.id == workflow_id)
                .ok_or(EngineError::WorkflowNotFound(workflow_id))?;
            if !workflow.is_active() {
                return Err(EngineError::WorkflowInactive(workflow_id));
            }
            workflow.clone()
        };

        let execution = WorkflowExecutor::new(&self.actions, &self.config)
            .run(&workflow, payload)
            .await;

        self.record(&execution);
        Ok(execution)
    }

    fn record(&self, execution: &Execution) {
        let mut state = self.state();
        state.history.push(execution.clone());
        match state.workflow_mut(execution.workflow_id) {
            Ok(workflow) => {
                workflow.execution_count += 1;
                workflow.completed_count += u64::from(execution.is_completed());
                workflow.success_rate =
                    analytics::success_rate(workflow.completed_count, workflow.execution_count);
            }
            Err(err) => warn!(execution_id = %execution.id, "cannot update counters: {err}"),
        }
    }

    /// Run every active workflow triggered by `event`, concurrently.
    ///
    /// Returns the finished executions in workflow creation order.
    #[instrument(skip(self, payload))]
    pub async fn fire_event(self: &Arc<Self>, event: &str, payload: Value) -> Vec<Execution> {
        let targets: Vec<(usize, Uuid)> = self
            .state()
            .workflows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_active() && w.responds_to(event))
            .map(|(i, w)| (i, w.id))
            .collect();

        info!(event, workflows = targets.len(), "trigger fired");

        let mut runs = JoinSet::new();
        for (position, workflow_id) in targets {
            let engine = Arc::clone(self);
            let payload = payload.clone();
            runs.spawn(async move {
                (position, engine.execute_workflow(workflow_id, payload).await)
            });
        }

        let mut finished = Vec::new();
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok((position, Ok(execution))) => finished.push((position, execution)),
                Ok((_, Err(err))) => warn!(event, "workflow not run: {err}"),
                Err(err) => warn!(event, "workflow run aborted: {err}"),
            }
        }
        finished.sort_by_key(|(position, _)| *position);
        finished.into_iter().map(|(_, execution)| execution).collect()
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    pub fn analyze_workflow_performance(
        &self,
        workflow_id: Uuid,
    ) -> Result<PerformanceAnalysis, EngineError> {
        let state = self.state();
        let workflow = state
            .workflows
            .iter()
            .find(|w| w.id == workflow_id)
            .ok_or(EngineError::WorkflowNotFound(workflow_id))?;
        Ok(analytics::analyze(workflow, &state.history, Utc::now()))
    }

    pub fn generate_automation_report(&self) -> AutomationReport {
        let state = self.state();
        analytics::report(&state.workflows, &state.history, &self.config.savings, Utc::now())
    }
}
