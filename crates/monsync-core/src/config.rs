//! Configuration module for monsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::is_path_safe;

/// Marker left in template instance names until the operator edits them
pub const PLACEHOLDER_MARKER: &str = "rename-me";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Top-level configuration for monsync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
    pub instances: Vec<InstanceConfig>,
}

/// Local tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory holding one subdirectory per instance.
    pub monitor_root: PathBuf,
    /// File name of the monitor document inside each monitor folder.
    pub body_file: String,
    /// File name of the last-sync baseline inside each monitor folder.
    pub state_file: String,
}

/// Alerting API client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retries for reads and updates. Creates are never retried.
    pub max_retries: u32,
    /// Page size of the monitor search; every instance must fit in one page.
    pub search_size: u32,
    /// Accept self-signed TLS certificates.
    pub accept_invalid_certs: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// One remote deployment and its local subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name; also the name of its folder under `sync.monitor_root`.
    pub name: String,
    /// Base URL of the search/alerting service.
    pub url: String,
    /// Inactive instances are skipped by every command.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Environment variable holding the username.
    #[serde(default)]
    pub env_username: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub env_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_true() -> bool {
    true
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            active: true,
            env_username: None,
            env_password: None,
            note: None,
        }
    }

    /// Whether the instance references credential variables at all
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.env_username.is_some() || self.env_password.is_some()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/monsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("monsync")
            .join("config.yaml")
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Starter configuration
    ///
    /// Contains one inactive placeholder instance, plus one inactive entry
    /// per folder already present under the monitor root so existing trees
    /// are picked up once their URL is filled in.
    pub fn template(existing_instances: &[String]) -> Self {
        let mut instances = vec![InstanceConfig {
            name: format!("{PLACEHOLDER_MARKER}-instance"),
            url: "https://localhost:9200".to_string(),
            active: false,
            env_username: Some("MONSYNC_USERNAME".to_string()),
            env_password: Some("MONSYNC_PASSWORD".to_string()),
            note: Some("rename, set the URL, then set active: true".to_string()),
        }];
        for name in existing_instances {
            instances.push(InstanceConfig {
                active: false,
                note: Some("found under monitor_root".to_string()),
                ..InstanceConfig::new(name.clone(), "https://localhost:9200")
            });
        }
        Self {
            instances,
            ..Self::default()
        }
    }

    /// Active instances, optionally narrowed to one name
    pub fn active_instances<'a>(&'a self, only: Option<&'a str>) -> impl Iterator<Item = &'a InstanceConfig> {
        self.instances
            .iter()
            .filter(|i| i.active)
            .filter(move |i| only.map_or(true, |name| i.name == name))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            monitor_root: PathBuf::from("monitors"),
            body_file: "monitor.json".to_string(),
            state_file: "sync-state.json".to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 3,
            search_size: 10_000,
            accept_invalid_certs: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Check the configuration for semantic errors.
    ///
    /// Returns an empty `Vec` when everything is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        for (field, value) in [
            ("sync.body_file", &self.sync.body_file),
            ("sync.state_file", &self.sync.state_file),
        ] {
            if !is_path_safe(value) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("'{value}' is not a valid file name"),
                });
            }
        }
        if self.sync.body_file == self.sync.state_file {
            errors.push(ValidationError {
                field: "sync.state_file".into(),
                message: "must differ from sync.body_file".into(),
            });
        }

        // --- remote ---
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.search_size == 0 {
            errors.push(ValidationError {
                field: "remote.search_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- instances ---
        let mut seen = HashSet::new();
        for (i, instance) in self.instances.iter().enumerate() {
            let field = |name: &str| format!("instances[{i}].{name}");

            if !is_path_safe(&instance.name) {
                errors.push(ValidationError {
                    field: field("name"),
                    message: format!("'{}' cannot be used as a folder name", instance.name),
                });
            }
            if !seen.insert(instance.name.as_str()) {
                errors.push(ValidationError {
                    field: field("name"),
                    message: format!("duplicate instance name '{}'", instance.name),
                });
            }
            if instance.active && instance.name.contains(PLACEHOLDER_MARKER) {
                errors.push(ValidationError {
                    field: field("active"),
                    message: format!("rename '{}' before activating it", instance.name),
                });
            }
            match url::Url::parse(&instance.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ValidationError {
                    field: field("url"),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }),
                Err(e) => errors.push(ValidationError {
                    field: field("url"),
                    message: format!("invalid URL '{}': {e}", instance.url),
                }),
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// # Example
///
/// ```rust,no_run
/// use monsync_core::config::{ConfigBuilder, InstanceConfig};
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .monitor_root(PathBuf::from("/srv/monitors"))
///     .instance(InstanceConfig::new("prod", "https://search.example.com:9200"))
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn monitor_root(mut self, root: PathBuf) -> Self {
        self.config.sync.monitor_root = root;
        self
    }

    pub fn request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.request_timeout_secs = seconds;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.remote.max_retries = retries;
        self
    }

    pub fn search_size(mut self, size: u32) -> Self {
        self.config.remote.search_size = size;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn instance(mut self, instance: InstanceConfig) -> Self {
        self.config.instances.push(instance);
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
