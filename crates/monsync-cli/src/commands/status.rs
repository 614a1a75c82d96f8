//! Status command
//!
//! `monsync status` computes what a sync pass would do for each active
//! instance and lists every monitor with its pending action. Nothing is
//! changed and nothing is asked.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use monsync_core::domain::{MonitorFailure, SyncAction, SyncDecision};
use monsync_core::ports::ApproveNone;
use monsync_sync::engine::SyncOptions;
use monsync_sync::retry::RetryPolicy;
use serde_json::json;

use super::{load_config, orchestrator, select_instances};
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only monitors whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Only this instance
    #[arg(long)]
    pub instance: Option<String>,
}

/// One row of the status table
#[derive(Debug, Clone, PartialEq)]
struct StatusRow {
    name: String,
    action: SyncAction,
    identity: String,
    enabled: Option<bool>,
    local_version: Option<i64>,
    remote_version: Option<i64>,
    detail: String,
}

impl StatusRow {
    fn from_decision(decision: &SyncDecision) -> Self {
        let body = decision
            .local
            .as_ref()
            .or(decision.remote.as_ref())
            .map(|r| &r.body);
        let detail = match (&decision.changes, decision.action) {
            (_, SyncAction::Prune) => format!(
                "duplicate of '{}'",
                decision.superseded_by.as_deref().unwrap_or_default()
            ),
            (Some(changes), _) if !changes.is_empty() => plural(changes.len(), "field"),
            _ => String::new(),
        };
        Self {
            name: decision.name().to_string(),
            action: decision.action,
            identity: decision.identity_label().unwrap_or_default(),
            enabled: body.and_then(|b| b.enabled),
            local_version: decision.local.as_ref().map(|r| r.version),
            remote_version: decision.remote.as_ref().map(|r| r.version),
            detail: if decision.concurrent_edit {
                format!("{detail} (changed on both sides)").trim().to_string()
            } else {
                detail
            },
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "action": self.action,
            "identity": self.identity,
            "enabled": self.enabled,
            "local_version": self.local_version,
            "remote_version": self.remote_version,
            "detail": self.detail,
        })
    }
}

fn version(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl StatusCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = load_config(config_path)?;
        let instances = select_instances(&config, self.instance.as_deref())?;
        let options = SyncOptions {
            dry_run: true,
            filter: self.filter.clone(),
            retry: RetryPolicy::new(config.remote.max_retries),
            ..Default::default()
        };
        let sync = orchestrator(&config, options, Arc::new(ApproveNone));

        let mut output = Vec::new();
        let mut unreachable = Vec::new();
        for instance in instances {
            match sync.plan(instance).await {
                Ok(plan) => {
                    let rows: Vec<StatusRow> =
                        plan.decisions.iter().map(StatusRow::from_decision).collect();
                    if format.is_json() {
                        output.push(json!({
                            "instance": instance.name,
                            "monitors": rows.iter().map(StatusRow::to_json).collect::<Vec<_>>(),
                            "failures": plan.failures,
                        }));
                    } else {
                        print_table(&instance.name, &rows, &plan.failures, &*formatter);
                    }
                }
                Err(err) => {
                    formatter.error(&format!("{}: {err}", instance.name));
                    if format.is_json() {
                        output.push(json!({"instance": instance.name, "error": err.to_string()}));
                    }
                    unreachable.push(instance.name.clone());
                }
            }
        }

        if format.is_json() {
            formatter.print_json(&serde_json::Value::Array(output));
        }
        if !unreachable.is_empty() {
            bail!("status unavailable for {}", unreachable.join(", "));
        }
        Ok(())
    }
}

fn print_table(
    instance: &str,
    rows: &[StatusRow],
    failures: &[MonitorFailure],
    formatter: &dyn OutputFormatter,
) {
    let pending = rows.iter().filter(|r| r.action.is_mutation()).count();
    formatter.success(&format!(
        "{instance}: {}, {} pending",
        plural(rows.len(), "monitor"),
        pending
    ));

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    formatter.info(&format!(
        "{:<width$}  {:<18}  {:<7}  {:>5}  {:>6}  {}",
        "NAME", "ACTION", "ENABLED", "LOCAL", "REMOTE", "DETAIL"
    ));
    for row in rows {
        let enabled = match row.enabled {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        formatter.info(&format!(
            "{:<width$}  {:<18}  {:<7}  {:>5}  {:>6}  {}",
            row.name,
            row.action.label(),
            enabled,
            version(row.local_version),
            version(row.remote_version),
            row.detail
        ));
    }

    for failure in failures {
        formatter.warn(&format!("{}: {}", failure.monitor, failure.reason));
    }
}
