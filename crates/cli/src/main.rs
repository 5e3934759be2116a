//! `automation-engine` CLI entry-point.
//!
//! Available sub-commands:
//! - `templates`: list the built-in workflow templates.
//! - `validate`:  validate a workflow definition JSON file.
//! - `run`:       instantiate a template and execute it once.
//! - `fire`:      load definitions and fire a trigger event at them.
//!
//! Executions and reports are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::{AutomationEngine, EngineConfig, Workflow, WorkflowOverrides, WorkflowSpec};

#[derive(Parser)]
#[command(
    name = "automation-engine",
    about = "Business workflow automation engine",
    version
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

/// Engine settings; flags win over the config file, which wins over defaults.
#[derive(Args)]
struct ConfigArgs {
    /// JSON file with engine settings.
    #[arg(long, global = true, env = "AUTOMATION_CONFIG")]
    config: Option<PathBuf>,

    /// Real milliseconds per step-delay minute (60000 = real time).
    #[arg(long, global = true, env = "AUTOMATION_DELAY_UNIT_MS")]
    delay_unit_ms: Option<u64>,

    /// Per-action timeout in milliseconds; 0 disables it.
    #[arg(long, global = true, env = "AUTOMATION_ACTION_TIMEOUT_MS")]
    action_timeout_ms: Option<u64>,

    /// Retries for transient action failures.
    #[arg(long, global = true, env = "AUTOMATION_MAX_RETRIES")]
    max_retries: Option<u32>,
}

impl ConfigArgs {
    fn load(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => read_json::<EngineConfig>(path)?,
            None => EngineConfig::default(),
        };
        if let Some(ms) = self.delay_unit_ms {
            config.delay_unit = Duration::from_millis(ms);
        }
        if let Some(ms) = self.action_timeout_ms {
            config.action_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in workflow templates.
    Templates,
    /// Validate a workflow definition file (one definition or an array).
    Validate {
        path: PathBuf,
    },
    /// Instantiate a template and execute it once.
    Run {
        /// Template key, e.g. `lead_nurturing`.
        #[arg(long)]
        template: String,
        /// Override the template's workflow name.
        #[arg(long)]
        name: Option<String>,
        /// Trigger payload as a JSON object.
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Also write the automation report to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Define workflows from a file and fire a trigger event at them.
    Fire {
        /// Workflow definition file (one definition or an array).
        #[arg(long)]
        definitions: PathBuf,
        /// Trigger event name, e.g. `new_lead_created`.
        #[arg(long)]
        event: String,
        /// Trigger payload as a JSON object.
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Also write the automation report to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.load()?;

    match cli.command {
        Command::Templates => {
            let engine = AutomationEngine::with_builtins(config);
            for (key, template) in engine.templates().iter() {
                println!("{key}");
                println!("  {}: {}", template.name, template.description);
                println!("  triggers: {}", template.triggers.join(", "));
                for step in &template.steps {
                    let condition = step
                        .condition
                        .as_deref()
                        .map(|c| format!(" if {c}"))
                        .unwrap_or_default();
                    println!("  - {} after {} min{condition}", step.action, step.delay);
                }
            }
        }

        Command::Validate { path } => {
            let specs = read_definitions(&path)?;
            let mut failed = 0usize;
            for spec in specs {
                let name = spec.name.clone();
                match Workflow::compile(spec) {
                    Ok(wf) => println!("✅ '{}' is valid ({} steps)", wf.name, wf.steps.len()),
                    Err(e) => {
                        failed += 1;
                        eprintln!("❌ '{name}': {e}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} invalid workflow definition(s) in {}", path.display());
            }
        }

        Command::Run { template, name, payload, report } => {
            let engine = AutomationEngine::with_builtins(config);
            let overrides = WorkflowOverrides {
                name,
                ..WorkflowOverrides::default()
            };
            let workflow = engine.create_from_template(&template, overrides)?;
            let execution = engine
                .execute_workflow(workflow.id, parse_payload(&payload)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&execution)?);
            write_report(&engine, report.as_deref())?;
        }

        Command::Fire { definitions, event, payload, report } => {
            let engine = Arc::new(AutomationEngine::with_builtins(config));
            for spec in read_definitions(&definitions)? {
                engine.define_workflow(spec)?;
            }
            let executions = engine.fire_event(&event, parse_payload(&payload)?).await;
            info!(event = %event, runs = executions.len(), "event handled");
            println!("{}", serde_json::to_string_pretty(&executions)?);
            write_report(&engine, report.as_deref())?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// A definitions file holds either one workflow or an array of them.
fn read_definitions(path: &Path) -> Result<Vec<WorkflowSpec>> {
    match read_json::<Value>(path)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).context("invalid workflow definition"))
            .collect(),
        single => Ok(vec![serde_json::from_value(single).context("invalid workflow definition")?]),
    }
}

fn parse_payload(raw: &str) -> Result<Value> {
    let payload: Value = serde_json::from_str(raw).context("payload is not valid JSON")?;
    if !payload.is_object() {
        bail!("payload must be a JSON object");
    }
    Ok(payload)
}

fn write_report(engine: &AutomationEngine, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let report = engine.generate_automation_report();
    std::fs::write(path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("cannot write report to {}", path.display()))?;
    info!(path = %path.display(), "automation report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_flags() -> ConfigArgs {
        ConfigArgs {
            config: None,
            delay_unit_ms: None,
            action_timeout_ms: None,
            max_retries: None,
        }
    }

    #[test]
    fn config_defaults_without_file_or_flags() {
        assert_eq!(no_flags().load().unwrap(), EngineConfig::default());
    }

    #[test]
    fn flags_override_the_config_file() {
        let file = json_file(r#"{ "max_retries": 7, "delay_unit_ms": 5, "action_timeout_ms": 2000 }"#);

        let config = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..no_flags()
        }
        .load()
        .unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.delay_unit, Duration::from_millis(5));
        assert_eq!(config.action_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.retry_base_delay, EngineConfig::default().retry_base_delay);

        let config = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            max_retries: Some(1),
            action_timeout_ms: Some(0),
            ..no_flags()
        }
        .load()
        .unwrap();
        assert_eq!(config.max_retries, 1);
        // zero disables the timeout
        assert_eq!(config.action_timeout, None);
        assert_eq!(config.delay_unit, Duration::from_millis(5));
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let file = json_file("{ not json");
        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            ..no_flags()
        };
        assert!(args.load().is_err());
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "automation-engine",
            "templates",
            "--action-timeout-ms",
            "0",
            "--max-retries",
            "2",
        ])
        .unwrap();
        let config = cli.config.load().unwrap();
        assert_eq!(config.action_timeout, None);
        assert_eq!(config.max_retries, 2);
        assert!(matches!(cli.command, Command::Templates));
    }

    #[test]
    fn definitions_file_holds_one_workflow_or_many() {
        let single = json_file(
            r#"{ "name": "welcome", "triggers": ["new_lead_created"], "steps": [{ "action": "send_welcome_email" }] }"#,
        );
        let specs = read_definitions(single.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "welcome");

        let many = json_file(
            r#"[ { "name": "a", "steps": [] }, { "name": "b", "steps": [{ "action": "add_to_crm", "delay": 60 }] } ]"#,
        );
        let specs = read_definitions(many.path()).unwrap();
        assert_eq!(
            specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(specs[1].steps.as_ref().unwrap()[0].delay, 60);

        // `name` has no default
        let nameless = json_file(r#"[ { "steps": [] } ]"#);
        assert!(read_definitions(nameless.path()).is_err());
        assert!(read_definitions(Path::new("/nonexistent/definitions.json")).is_err());
    }

    #[test]
    fn payload_must_be_a_json_object() {
        assert_eq!(parse_payload(r#"{ "lead_score": 80 }"#).unwrap()["lead_score"], 80);
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("42").is_err());
        assert!(parse_payload("{ not json").is_err());
    }
}
