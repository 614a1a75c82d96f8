//! Print command
//!
//! `monsync print` dumps the local monitor documents of the active
//! instances as JSON or YAML. Large dumps ask first unless `--force`.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use monsync_core::domain::MonitorRecord;
use monsync_core::ports::ILocalStore;
use monsync_sync::store::FsMonitorStore;
use serde_json::{json, Value};

use super::{load_config, select_instances};
use crate::output::{get_formatter, plural, OutputFormat};
use crate::prompt::ask;

/// Above this many monitors the operator is asked to confirm
const CONFIRM_ABOVE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct PrintCommand {
    /// Document format
    #[arg(long, value_enum, default_value_t = DocumentFormat::Json)]
    pub format: DocumentFormat,

    /// Only monitors whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,

    /// Only this instance
    #[arg(long)]
    pub instance: Option<String>,

    /// Do not ask before printing many monitors
    #[arg(long, short)]
    pub force: bool,
}

fn document(record: &MonitorRecord) -> Value {
    let id = record
        .identity
        .canonical()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();
    json!({"_id": id, "_version": record.version, "monitor": record.body.to_value()})
}

fn render(record: &MonitorRecord, format: DocumentFormat) -> Result<String> {
    let doc = document(record);
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(&doc).context("Failed to render JSON"),
        DocumentFormat::Yaml => serde_yaml::to_string(&doc).context("Failed to render YAML"),
    }
}

impl PrintCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = load_config(config_path)?;
        let store = FsMonitorStore::from_config(&config.sync);

        let mut selected: Vec<(String, MonitorRecord)> = Vec::new();
        for instance in select_instances(&config, self.instance.as_deref())? {
            let snapshot = store.load_all(instance).await?;
            for failure in &snapshot.failures {
                formatter.warn(&format!("{}: {}", failure.folder.display(), failure.reason));
            }
            selected.extend(
                snapshot
                    .records
                    .into_iter()
                    .filter(|r| r.matches_filter(self.filter.as_deref()))
                    .map(|r| (instance.name.clone(), r)),
            );
        }

        if selected.len() > CONFIRM_ABOVE && !self.force && !format.is_json() {
            let question = format!(
                "Printing {}, consider narrowing with --filter. Continue?",
                plural(selected.len(), "monitor")
            );
            if !ask(&question).await? {
                return Ok(());
            }
        }

        if format.is_json() {
            let docs: Vec<Value> = selected
                .iter()
                .map(|(instance, record)| json!({"instance": instance, "document": document(record)}))
                .collect();
            formatter.print_json(&Value::Array(docs));
            return Ok(());
        }

        for (instance, record) in &selected {
            let header = format!("-------- {instance} / {} --------", record.name());
            println!("{header}");
            println!("{}", render(record, self.format)?.trim_end());
            println!("{}", "-".repeat(header.chars().count()));
        }
        Ok(())
    }
}
