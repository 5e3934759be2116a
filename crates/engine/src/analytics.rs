//! Execution statistics, per-workflow analysis, and the automation report.
//!
//! Everything here is a pure function of the workflows and the execution
//! history; the engine passes in a snapshot and the current time.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SavingsConfig;
use crate::models::{Execution, ExecutionStatus, Workflow};

const TOP_ERRORS: usize = 5;
const TOP_WORKFLOWS: usize = 5;
const RECENT_ACTIVITY: usize = 10;

const LOW_SUCCESS_RATE: f64 = 80.0;
const SLOW_RUN_MS: u64 = 5 * 60 * 1000;
const RECENT_FAILURE_LIMIT: usize = 3;
const STALE_HISTORY_LIMIT: usize = 1000;

/// `100 * completed / total`, rounded to one decimal; `0.0` when `total == 0`.
pub fn success_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Replay `history` for one workflow: `(total, completed)`.
pub fn replay_counts(workflow_id: Uuid, history: &[Execution]) -> (u64, u64) {
    history
        .iter()
        .filter(|e| e.workflow_id == workflow_id)
        .fold((0, 0), |(total, completed), e| {
            (total + 1, completed + u64::from(e.is_completed()))
        })
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Reliability,
    Performance,
    Stability,
    Setup,
    Optimization,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub priority: Priority,
}

impl Recommendation {
    fn new(kind: RecommendationKind, priority: Priority, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            priority,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-workflow analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrequency {
    pub error: String,
    pub count: usize,
}

/// Aggregated history of a single workflow.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceAnalysis {
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub success_rate: f64,
    /// Mean duration of completed runs, in milliseconds.
    pub average_duration_ms: u64,
    pub common_errors: Vec<ErrorFrequency>,
    pub recommendations: Vec<Recommendation>,
}

/// Analyse `workflow` over the whole `history`.
pub fn analyze(workflow: &Workflow, history: &[Execution], now: DateTime<Utc>) -> PerformanceAnalysis {
    let runs: Vec<&Execution> = history
        .iter()
        .filter(|e| e.workflow_id == workflow.id)
        .collect();

    let (total, completed) = replay_counts(workflow.id, history);
    let failed = runs.iter().filter(|e| e.is_failed()).count() as u64;
    let rate = success_rate(completed, total);
    let average_duration_ms = average_duration(&runs);

    let mut recommendations = Vec::new();
    if total > 0 && rate < LOW_SUCCESS_RATE {
        recommendations.push(Recommendation::new(
            RecommendationKind::Reliability,
            Priority::High,
            format!("success rate is {rate}%; review the failing steps"),
        ));
    }
    if average_duration_ms > SLOW_RUN_MS {
        recommendations.push(Recommendation::new(
            RecommendationKind::Performance,
            Priority::Medium,
            "runs take longer than 5 minutes on average; optimize slow actions",
        ));
    }
    let day_ago = now - Duration::hours(24);
    let recent_failures = runs
        .iter()
        .filter(|e| e.is_failed() && e.started_at > day_ago)
        .count();
    if recent_failures > RECENT_FAILURE_LIMIT {
        recommendations.push(Recommendation::new(
            RecommendationKind::Stability,
            Priority::High,
            format!("{recent_failures} failures in the last 24 hours; check the integrations"),
        ));
    }

    PerformanceAnalysis {
        workflow_id: workflow.id,
        workflow_name: workflow.name.clone(),
        total_executions: total,
        successful_executions: completed,
        failed_executions: failed,
        success_rate: rate,
        average_duration_ms,
        common_errors: common_errors(&runs),
        recommendations,
    }
}

fn average_duration(runs: &[&Execution]) -> u64 {
    let durations: Vec<u64> = runs
        .iter()
        .filter(|e| e.is_completed())
        .filter_map(|e| e.duration_ms)
        .collect();
    if durations.is_empty() {
        return 0;
    }
    let sum: u128 = durations.iter().map(|&d| u128::from(d)).sum();
    (sum as f64 / durations.len() as f64).round() as u64
}

/// Most frequent distinct error messages, ties broken alphabetically.
fn common_errors(runs: &[&Execution]) -> Vec<ErrorFrequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for error in runs.iter().flat_map(|e| e.errors.iter()) {
        *counts.entry(error.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<ErrorFrequency> = counts
        .into_iter()
        .map(|(error, count)| ErrorFrequency {
            error: error.to_owned(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
    ranked.truncate(TOP_ERRORS);
    ranked
}

// ---------------------------------------------------------------------------
// Engine-wide report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationSavings {
    pub time_saved_minutes: u64,
    pub time_saved_hours: u64,
    pub cost_saved: u64,
    pub tasks_automated: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_workflows: usize,
    pub active_workflows: usize,
    pub total_executions: usize,
    pub overall_success_rate: f64,
    pub automation_savings: AutomationSavings,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowPerformance {
    pub workflow_id: Uuid,
    pub name: String,
    pub executions: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub execution_id: Uuid,
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Snapshot of the whole engine, ready for console or JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub top_performing_workflows: Vec<WorkflowPerformance>,
    pub recent_activity: Vec<ActivityEntry>,
    pub recommendations: Vec<Recommendation>,
}

pub fn savings(total_executions: u64, config: &SavingsConfig) -> AutomationSavings {
    let minutes = total_executions * u64::from(config.manual_minutes_per_run);
    let hours = minutes as f64 / 60.0;
    AutomationSavings {
        time_saved_minutes: minutes,
        time_saved_hours: hours.round() as u64,
        cost_saved: (hours * config.hourly_rate).round() as u64,
        tasks_automated: total_executions,
    }
}

/// Build the engine-wide report.
pub fn report(
    workflows: &[Workflow],
    history: &[Execution],
    config: &SavingsConfig,
    now: DateTime<Utc>,
) -> AutomationReport {
    let total_executions = history.len();
    let completed = history.iter().filter(|e| e.is_completed()).count();

    let mut top: Vec<WorkflowPerformance> = workflows
        .iter()
        .map(|w| WorkflowPerformance {
            workflow_id: w.id,
            name: w.name.clone(),
            executions: w.execution_count,
            success_rate: w.success_rate,
        })
        .collect();
    top.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    top.truncate(TOP_WORKFLOWS);

    let names: HashMap<Uuid, &str> = workflows.iter().map(|w| (w.id, w.name.as_str())).collect();
    let mut recent: Vec<&Execution> = history.iter().collect();
    recent.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    let recent_activity = recent
        .into_iter()
        .take(RECENT_ACTIVITY)
        .map(|e| ActivityEntry {
            execution_id: e.id,
            workflow_name: names.get(&e.workflow_id).copied().unwrap_or("Unknown").to_owned(),
            status: e.status,
            started_at: e.started_at,
            duration_ms: e.duration_ms,
        })
        .collect();

    AutomationReport {
        generated_at: now,
        summary: ReportSummary {
            total_workflows: workflows.len(),
            active_workflows: workflows.iter().filter(|w| w.is_active()).count(),
            total_executions,
            overall_success_rate: success_rate(completed as u64, total_executions as u64),
            automation_savings: savings(total_executions as u64, config),
        },
        top_performing_workflows: top,
        recent_activity,
        recommendations: system_recommendations(workflows, history, now),
    }
}

fn system_recommendations(
    workflows: &[Workflow],
    history: &[Execution],
    now: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if workflows.is_empty() {
        recommendations.push(Recommendation::new(
            RecommendationKind::Setup,
            Priority::High,
            "no workflows yet; start from one of the built-in templates",
        ));
    }

    let inactive = workflows.iter().filter(|w| !w.is_active()).count();
    if inactive > 0 {
        recommendations.push(Recommendation::new(
            RecommendationKind::Optimization,
            Priority::Medium,
            format!("{inactive} inactive workflow(s) need review"),
        ));
    }

    let month_ago = now - Duration::days(30);
    let stale = history.iter().filter(|e| e.started_at < month_ago).count();
    if stale > STALE_HISTORY_LIMIT {
        recommendations.push(Recommendation::new(
            RecommendationKind::Maintenance,
            Priority::Low,
            format!("{stale} executions are older than 30 days; prune the history"),
        ));
    }

    recommendations
}
