//! Config command - view, check and create the configuration file
//!
//! - `monsync config show`: print the effective configuration
//! - `monsync config validate`: report every problem in the file
//! - `monsync config init`: write a starter file

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use monsync_core::config::Config;
use serde_json::json;
use tracing::info;

use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the current configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
            ConfigCommand::Init { force } => execute_init(config_path, *force, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let exists = config_path.exists();
    let config = if exists {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    info!(config_path = %config_path.display(), exists, "Showing configuration");

    if format.is_json() {
        let value =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&value);
        return Ok(());
    }

    if exists {
        formatter.success(&format!("Configuration ({})", config_path.display()));
    } else {
        formatter.warn(&format!(
            "{} not found, showing defaults",
            config_path.display()
        ));
    }
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
    for line in yaml.lines() {
        formatter.info(line);
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load(config_path)?;
    let errors = config.validate();

    if format.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
        let active = config.active_instances(None).count();
        formatter.info(&format!("{} active", plural(active, "instance")));
    } else {
        formatter.error(&format!("Configuration has {}:", plural(errors.len(), "error")));
        formatter.info(&format!("File: {}", config_path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if !errors.is_empty() {
        bail!("invalid configuration");
    }
    Ok(())
}

fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    if config_path.exists() && !force {
        bail!(
            "{} already exists; use --force to overwrite",
            config_path.display()
        );
    }

    let existing = existing_instance_folders(&Config::default().sync.monitor_root);
    let config = Config::template(&existing);
    config.save(config_path)?;
    info!(config_path = %config_path.display(), found = existing.len(), "Wrote starter configuration");

    if format.is_json() {
        formatter.print_json(&json!({
            "config_path": config_path.display().to_string(),
            "instances": config.instances.iter().map(|i| &i.name).collect::<Vec<_>>(),
        }));
    } else {
        formatter.success(&format!("Wrote {}", config_path.display()));
        if !existing.is_empty() {
            formatter.info(&format!(
                "Added {} found under the monitor root as inactive: {}",
                plural(existing.len(), "instance"),
                existing.join(", ")
            ));
        }
        formatter.info("Edit the file, then run 'monsync config validate'");
    }
    Ok(())
}

/// Directory names directly under `root`, sorted; hidden ones are skipped
fn existing_instance_folders(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    names
}
