//! `engine` crate: workflow models, condition expressions, the template
//! catalog, and the automation engine that runs workflows and reports on them.

pub mod models;
pub mod error;
pub mod condition;
pub mod config;
pub mod templates;
pub mod executor;
pub mod engine;
pub mod analytics;

pub use models::{
    Execution, ExecutionStatus, Step, StepRecord, StepSpec, StepStatus, Workflow,
    WorkflowOverrides, WorkflowSpec, WorkflowStatus,
};
pub use error::{EngineError, ValidationError};
pub use condition::Condition;
pub use config::EngineConfig;
pub use templates::{TemplateCatalog, WorkflowTemplate};
pub use executor::WorkflowExecutor;
pub use engine::AutomationEngine;
pub use analytics::{AutomationReport, PerformanceAnalysis};
