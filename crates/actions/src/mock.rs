//! `MockAction`: a test double for `ActionHandler`.
//!
//! Useful in unit and integration tests where the real side effect is
//! either unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{ActionContext, ActionError, ActionHandler};

/// Shared, ordered record of which mocks ran.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Behaviour injected into `MockAction` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
    /// Fail with a `Retryable` error for the first `n` calls, then succeed.
    Flaky { failures: u32, value: Value },
    /// Sleep on the tokio timer, then return the value.
    Delayed(Duration, Value),
}

/// A mock action that records every payload it receives and returns a
/// programmer-specified result.
pub struct MockAction {
    /// Label used in test assertions and in the journal.
    pub name: String,
    /// What the action will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All payloads seen by this action (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
    journal: Option<Journal>,
    attempts: AtomicU32,
}

impl MockAction {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
            journal: None,
            attempts: AtomicU32::new(0),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailFatal(msg.into()))
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailRetryable(msg.into()))
    }

    /// Create a mock that fails retryably `failures` times before succeeding.
    pub fn flaky(name: impl Into<String>, failures: u32, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::Flaky { failures, value })
    }

    /// Create a mock that takes `delay` to succeed.
    pub fn delayed(name: impl Into<String>, delay: Duration, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::Delayed(delay, value))
    }

    /// Append this mock's name to `journal` on every call.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Number of times this action has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn output(&self, value: &Value) -> Value {
        // Tag the output with the mock's name so tests can tell results apart.
        let mut out = json!({ "action": self.name });
        if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), value.as_object()) {
            for (k, val) in v_obj {
                out_obj.insert(k.clone(), val.clone());
            }
        }
        out
    }
}

#[async_trait]
impl ActionHandler for MockAction {
    async fn execute(&self, payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        self.calls.lock().unwrap().push(payload.clone());
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.name.clone());
        }

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(self.output(v)),
            MockBehaviour::FailRetryable(msg) => Err(ActionError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg) => Err(ActionError::Fatal(msg.clone())),
            MockBehaviour::Flaky { failures, value } => {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < *failures {
                    Err(ActionError::Retryable(format!("{} flaked (attempt {})", self.name, attempt + 1)))
                } else {
                    Ok(self.output(value))
                }
            }
            MockBehaviour::Delayed(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(self.output(value))
            }
        }
    }
}
