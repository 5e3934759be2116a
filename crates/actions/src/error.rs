//! Action-level error type.

use thiserror::Error;

/// Errors returned by an action handler's `execute` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable`: the invocation is repeated with exponential back-off.
/// - `Fatal`:     the step is recorded as failed straight away.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Transient failure (rate limit, flaky upstream); worth another try.
    #[error("retryable action error: {0}")]
    Retryable(String),

    /// Permanent failure; retrying will not help.
    #[error("fatal action error: {0}")]
    Fatal(String),
}
