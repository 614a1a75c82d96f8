//! Sync command
//!
//! `monsync sync` runs one sync pass over every active instance (or the one
//! named with `--instance`) and prints a report per instance. The command
//! fails when any instance could not be processed.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use monsync_core::domain::{RunReport, SyncReport};
use monsync_core::ports::{ApproveNone, IConfirmation};
use monsync_sync::engine::SyncOptions;
use monsync_sync::retry::RetryPolicy;

use super::{load_config, orchestrator, select_instances, to_json};
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};
use crate::prompt::ConsoleConfirmation;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Apply every decision without asking
    #[arg(long, short)]
    pub force: bool,

    /// Only monitors whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Only this instance
    #[arg(long)]
    pub instance: Option<String>,
}

impl SyncCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = load_config(config_path)?;
        let instances = select_instances(&config, self.instance.as_deref())?;

        // JSON output cannot share stdout with prompts, so it never asks
        let confirmation: Arc<dyn IConfirmation> = if format.is_json() && !self.force {
            formatter.warn("--json without --force declines every change");
            Arc::new(ApproveNone)
        } else {
            Arc::new(ConsoleConfirmation)
        };
        let options = SyncOptions {
            dry_run: self.dry_run,
            force: self.force,
            filter: self.filter.clone(),
            retry: RetryPolicy::new(config.remote.max_retries),
        };

        if self.dry_run {
            formatter.info("Dry run: no changes will be made");
        }
        let run = orchestrator(&config, options, confirmation)
            .run(instances)
            .await;

        if format.is_json() {
            formatter.print_json(&to_json(&run)?);
        } else {
            print_run(&run, &*formatter);
        }

        let fatal: Vec<&str> = run
            .instances
            .iter()
            .filter(|r| r.is_fatal())
            .map(|r| r.instance.as_str())
            .collect();
        if !fatal.is_empty() {
            bail!("sync failed for {}: {}", plural(fatal.len(), "instance"), fatal.join(", "));
        }
        Ok(())
    }
}

fn print_run(run: &RunReport, formatter: &dyn OutputFormatter) {
    for report in &run.instances {
        print_report(report, formatter);
    }
}

fn print_report(report: &SyncReport, formatter: &dyn OutputFormatter) {
    if let Some(reason) = &report.fatal {
        formatter.error(&format!("{}: {reason}", report.instance));
    } else if report.total_changes() == 0 && report.failed == 0 {
        formatter.success(&format!("{}: already up to date", report.instance));
    } else {
        let verb = if report.dry_run { "would apply" } else { "applied" };
        formatter.success(&format!(
            "{}: {verb} {}",
            report.instance,
            plural(report.total_changes(), "change")
        ));
    }

    let counts = [
        ("Created remote", report.created_remote),
        ("Created local", report.created_local),
        ("Updated remote", report.updated_remote),
        ("Updated local", report.updated_local),
        ("Reconciled", report.reconciled),
        ("Deduplicated", report.deduplicated),
        ("Unchanged", report.no_op),
        ("Skipped", report.skipped),
    ];
    for (label, count) in counts {
        if count > 0 {
            formatter.info(&format!("{:<15} {count}", format!("{label}:")));
        }
    }

    if !report.failures.is_empty() {
        formatter.error(&format!(
            "{}: {} failed",
            report.instance,
            plural(report.failures.len(), "monitor")
        ));
        for failure in &report.failures {
            let identity = failure
                .identity
                .as_deref()
                .map(|id| format!(" ({id})"))
                .unwrap_or_default();
            formatter.info(&format!("  - {}{identity}: {}", failure.monitor, failure.reason));
        }
    }
}
