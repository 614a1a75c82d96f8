//! Local store port (driven/secondary port)
//!
//! The local side of a sync: one directory per instance, one subdirectory
//! per monitor named after the sanitized monitor name.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result`; adapters attach context and the orchestrator
//!   classifies failures per monitor.
//! - `load_all` never fails because of a single bad folder. Unreadable
//!   monitors are returned in [`LocalSnapshot::failures`] so the pass can
//!   continue with the rest.

use std::path::{Path, PathBuf};

use crate::config::InstanceConfig;
use crate::domain::{FailureKind, MonitorRecord};

/// A folder that could not be turned into a record
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub folder: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// Everything read from one instance directory
#[derive(Debug, Clone, Default)]
pub struct LocalSnapshot {
    /// Records in traversal order (sorted by folder path)
    pub records: Vec<MonitorRecord>,
    pub failures: Vec<LoadFailure>,
}

/// Port trait for the on-disk monitor tree
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    /// Directory holding the given instance's monitors
    fn instance_root(&self, instance: &InstanceConfig) -> PathBuf;

    /// Reads every monitor folder of the instance
    async fn load_all(&self, instance: &InstanceConfig) -> anyhow::Result<LocalSnapshot>;

    /// Creates or updates a monitor folder
    ///
    /// Writes `record` into `<instance root>/<folder_name>`. If the record
    /// already lives in a differently named folder, the body is written in
    /// place first and the folder is renamed afterwards, so a failure never
    /// leaves a half-moved folder without its body file. The record's
    /// `sync_state`, when present, is stored next to the body.
    ///
    /// # Returns
    /// The folder the record now lives in
    async fn write(
        &self,
        instance: &InstanceConfig,
        record: &MonitorRecord,
        folder_name: &str,
    ) -> anyhow::Result<PathBuf>;

    /// Removes a folder superseded by deduplication
    ///
    /// Implementations must refuse folders outside the instance root.
    async fn prune(&self, instance: &InstanceConfig, folder: &Path) -> anyhow::Result<()>;
}
