pub mod completions;
pub mod config;
pub mod print;
pub mod status;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use monsync_core::config::{Config, InstanceConfig};
use monsync_core::ports::IConfirmation;
use monsync_opensearch::provider::OpenSearchProvider;
use monsync_sync::engine::{SyncOptions, SyncOrchestrator};
use monsync_sync::store::FsMonitorStore;
use tracing::info;

use crate::credentials::env_resolver;

/// Load and validate the configuration file; a missing file is an error
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!(
            "configuration file {} not found; run 'monsync config init' to create one",
            path.display()
        );
    }
    let config = Config::load(path)?;
    let errors = config.validate();
    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
        bail!("invalid configuration {}:\n{}", path.display(), lines.join("\n"));
    }
    info!(config_path = %path.display(), instances = config.instances.len(), "Loaded configuration");
    Ok(config)
}

/// Active instances, optionally narrowed to one by name
pub fn select_instances<'a>(config: &'a Config, only: Option<&'a str>) -> Result<Vec<&'a InstanceConfig>> {
    let selected: Vec<_> = config.active_instances(only).collect();
    if selected.is_empty() {
        match only {
            Some(name) => bail!("no active instance named '{name}'"),
            None => bail!("no active instances configured"),
        }
    }
    Ok(selected)
}

pub fn orchestrator(
    config: &Config,
    options: SyncOptions,
    confirmation: Arc<dyn IConfirmation>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        Arc::new(FsMonitorStore::from_config(&config.sync)),
        Arc::new(OpenSearchProvider::new(&config.remote, env_resolver())),
        confirmation,
        options,
    )
}

/// Serialize for `--json` output
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("Failed to serialize output")
}
