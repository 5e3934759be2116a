//! Workflow execution.
//!
//! `WorkflowExecutor` runs one workflow against one trigger payload:
//! 1. Walks the steps in declaration order.
//! 2. Skips steps whose condition does not hold for the payload.
//! 3. Suspends on the tokio timer for each step's delay.
//! 4. Dispatches the step's action through the `ActionRegistry`, honouring
//!    the configured timeout and retrying `ActionError::Retryable`.
//! 5. Aborts on the first failed *required* step.
//!
//! The executor never returns an error: every outcome lands in the returned
//! [`Execution`]. Bookkeeping (history, counters) is the engine's job.

use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use actions::{ActionContext, ActionError, ActionHandler, ActionRegistry};

use crate::config::EngineConfig;
use crate::models::{Execution, ExecutionStatus, Step, StepRecord, StepStatus, Workflow};

/// Result of dispatching one step, retries included.
struct Dispatch {
    result: Result<Value, String>,
    attempts: u32,
}

/// Borrowing orchestrator for a single run.
pub struct WorkflowExecutor<'a> {
    registry: &'a ActionRegistry,
    config: &'a EngineConfig,
}

impl<'a> WorkflowExecutor<'a> {
    pub fn new(registry: &'a ActionRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Run `workflow` to a terminal state and return the finished execution.
    #[instrument(skip(self, workflow, payload), fields(workflow_id = %workflow.id, workflow = %workflow.name))]
    pub async fn run(&self, workflow: &Workflow, payload: Value) -> Execution {
        let mut execution = Execution::start(workflow.id, payload);
        let clock = Instant::now();
        info!(execution_id = %execution.id, steps = workflow.steps.len(), "execution started");

        for (index, step) in workflow.steps.iter().enumerate() {
            if let Some(condition) = &step.condition {
                if !condition.evaluate(&execution.trigger_payload) {
                    debug!(step = index, action = %step.action, %condition, "condition not met, skipping");
                    execution
                        .steps
                        .push(StepRecord::skipped(index, step.action, format!("condition not met: {condition}")));
                    continue;
                }
            }

            if step.delay > 0 {
                let wait = self.config.step_delay(step.delay);
                debug!(step = index, minutes = step.delay, ?wait, "delaying step");
                tokio::time::sleep(wait).await;
            }

            let record = self.run_step(workflow, &execution, index, step).await;
            let failure = (record.status == StepStatus::Failed).then(|| {
                format!(
                    "step {index} ({}) failed: {}",
                    step.action,
                    record.reason.as_deref().unwrap_or("unknown error")
                )
            });
            execution.steps.push(record);

            if let Some(message) = failure {
                execution.errors.push(message.clone());
                if step.required {
                    error!(execution_id = %execution.id, step = index, "{message}; aborting run");
                    execution.error = Some(message);
                    execution.status = ExecutionStatus::Failed;
                    break;
                }
                warn!(execution_id = %execution.id, step = index, "{message}; step is optional, continuing");
            }
        }

        if execution.status == ExecutionStatus::Running {
            execution.status = ExecutionStatus::Completed;
        }
        execution.finished_at = Some(Utc::now());
        execution.duration_ms = Some(u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX));

        info!(
            execution_id = %execution.id,
            status = ?execution.status,
            duration_ms = execution.duration_ms,
            "execution finished"
        );
        execution
    }

    async fn run_step(
        &self,
        workflow: &Workflow,
        execution: &Execution,
        index: usize,
        step: &Step,
    ) -> StepRecord {
        let ctx = ActionContext {
            workflow_id: workflow.id,
            execution_id: execution.id,
            step_index: index,
            action: step.action,
        };

        let dispatch = match self.registry.get(step.action) {
            Some(handler) => {
                self.execute_with_retry(handler.as_ref(), &execution.trigger_payload, &ctx)
                    .await
            }
            None => Dispatch {
                result: Err(format!("no handler registered for action '{}'", step.action)),
                attempts: 0,
            },
        };

        let (status, output, reason) = match dispatch.result {
            Ok(output) => {
                debug!(step = index, action = %step.action, "step completed");
                (StepStatus::Completed, Some(output), None)
            }
            Err(reason) => (StepStatus::Failed, None, Some(reason)),
        };

        StepRecord {
            step_index: index,
            action: step.action,
            status,
            reason,
            output,
            attempts: dispatch.attempts,
            executed_at: Some(Utc::now()),
        }
    }

    // -----------------------------------------------------------------------
    // Internal: invoke a handler with timeout and retry logic.
    // -----------------------------------------------------------------------

    async fn invoke(
        &self,
        handler: &dyn ActionHandler,
        payload: &Value,
        ctx: &ActionContext,
    ) -> Result<Value, ActionError> {
        match self.config.action_timeout {
            Some(limit) => tokio::time::timeout(limit, handler.execute(payload, ctx))
                .await
                .unwrap_or_else(|_| Err(ActionError::Retryable(format!("timed out after {limit:?}")))),
            None => handler.execute(payload, ctx).await,
        }
    }

    async fn execute_with_retry(
        &self,
        handler: &dyn ActionHandler,
        payload: &Value,
        ctx: &ActionContext,
    ) -> Dispatch {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.invoke(handler, payload, ctx).await {
                Ok(output) => {
                    return Dispatch { result: Ok(output), attempts };
                }

                Err(ActionError::Fatal(msg)) => {
                    return Dispatch { result: Err(msg), attempts };
                }

                Err(ActionError::Retryable(msg)) => {
                    let retries = attempts - 1;
                    if retries >= self.config.max_retries {
                        return Dispatch {
                            result: Err(format!("retry limit exceeded: {msg}")),
                            attempts,
                        };
                    }

                    let delay = self
                        .config
                        .retry_base_delay
                        .saturating_mul(2u32.saturating_pow(retries));

                    warn!(
                        "action '{}' retryable error (attempt {}/{}), retrying in {:?}: {}",
                        ctx.action,
                        attempts,
                        self.config.max_retries.saturating_add(1),
                        delay,
                        msg
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
