//! Filesystem monitor store (secondary/driven adapter)
//!
//! Implements [`ILocalStore`] on top of `tokio::fs`.
//!
//! ```text
//! <root>/<instance>/<folder>/monitor.json
//! <root>/<instance>/<folder>/sync-state.json
//! ```
//!
//! Body and state files are written to a `.tmp` sibling and renamed into
//! place. A record that moves to a new folder is written where it lives
//! first and the folder is renamed afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use monsync_core::config::{InstanceConfig, SyncConfig};
use monsync_core::domain::{
    is_path_safe, FailureKind, MonitorBody, MonitorIdentity, MonitorRecord, SyncState,
};
use monsync_core::ports::{ILocalStore, LoadFailure, LocalSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// On-disk shape of `monitor.json`
#[derive(Debug, Serialize, Deserialize)]
struct StoredMonitor {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_version", default)]
    version: i64,
    monitor: Value,
}

/// [`ILocalStore`] over a directory tree
#[derive(Debug, Clone)]
pub struct FsMonitorStore {
    root: PathBuf,
    body_file: String,
    state_file: String,
}

impl FsMonitorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = SyncConfig::default();
        Self {
            root: root.into(),
            body_file: defaults.body_file,
            state_file: defaults.state_file,
        }
    }

    pub fn from_config(sync: &SyncConfig) -> Self {
        Self {
            root: sync.monitor_root.clone(),
            body_file: sync.body_file.clone(),
            state_file: sync.state_file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn load_folder(&self, folder: &Path) -> Result<Option<MonitorRecord>, LoadFailure> {
        let failure = |kind: FailureKind, reason: String| LoadFailure {
            folder: folder.to_path_buf(),
            kind,
            reason,
        };

        let body_path = folder.join(&self.body_file);
        let raw = match tokio::fs::read(&body_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if is_empty_dir(folder).await.unwrap_or(false) {
                    debug!(folder = %folder.display(), "Ignoring empty folder");
                    return Ok(None);
                }
                return Err(failure(
                    FailureKind::LocalWrite,
                    format!("folder has no {}", self.body_file),
                ));
            }
            Err(e) => {
                return Err(failure(
                    FailureKind::LocalWrite,
                    format!("cannot read {}: {e}", body_path.display()),
                ))
            }
        };

        let stored: StoredMonitor = serde_json::from_slice(&raw).map_err(|e| {
            failure(
                FailureKind::Validation,
                format!("{} is not a monitor document: {e}", self.body_file),
            )
        })?;
        let body = MonitorBody::from_value(stored.monitor)
            .map_err(|e| failure(FailureKind::Validation, e.to_string()))?;
        let identity = MonitorIdentity::from_stored(stored.id.as_deref())
            .map_err(|e| failure(FailureKind::Validation, e.to_string()))?;

        let sync_state = self.load_state(folder).await;
        Ok(Some(
            MonitorRecord::local(identity, stored.version, body, folder).with_sync_state(sync_state),
        ))
    }

    /// A missing or unreadable state file only costs the baseline
    async fn load_state(&self, folder: &Path) -> Option<SyncState> {
        let path = folder.join(&self.state_file);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read sync state, ignoring");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed sync state, ignoring");
                None
            }
        }
    }
}

async fn is_empty_dir(path: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Write-to-temp + rename in the same directory
async fn write_atomic(target: &Path, data: &[u8]) -> anyhow::Result<()> {
    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };
    tokio::fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, target)
        .await
        .with_context(|| format!("Failed to move {} into place", target.display()))?;
    Ok(())
}

fn to_pretty_json<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(value)?;
    out.push(b'\n');
    Ok(out)
}

#[async_trait::async_trait]
impl ILocalStore for FsMonitorStore {
    fn instance_root(&self, instance: &InstanceConfig) -> PathBuf {
        self.root.join(&instance.name)
    }

    #[instrument(skip(self, instance), fields(instance = %instance.name))]
    async fn load_all(&self, instance: &InstanceConfig) -> anyhow::Result<LocalSnapshot> {
        let root = self.instance_root(instance);
        let mut reader = match tokio::fs::read_dir(&root).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(root = %root.display(), "Instance folder does not exist yet");
                return Ok(LocalSnapshot::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", root.display()))
            }
        };

        let mut folders = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .with_context(|| format!("Failed to list {}", root.display()))?
        {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                debug!(entry = ?name, "Skipping hidden entry");
                continue;
            }
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                debug!(entry = ?name, "Skipping plain file");
                continue;
            }
            folders.push(entry.path());
        }
        folders.sort();

        let mut snapshot = LocalSnapshot::default();
        for folder in folders {
            match self.load_folder(&folder).await {
                Ok(Some(record)) => snapshot.records.push(record),
                Ok(None) => {}
                Err(failure) => {
                    warn!(
                        folder = %failure.folder.display(),
                        kind = ?failure.kind,
                        reason = %failure.reason,
                        "Skipping unreadable monitor folder"
                    );
                    snapshot.failures.push(failure);
                }
            }
        }

        debug!(
            records = snapshot.records.len(),
            failures = snapshot.failures.len(),
            "Loaded local monitors"
        );
        Ok(snapshot)
    }

    #[instrument(skip(self, instance, record), fields(instance = %instance.name, identity = %record.identity))]
    async fn write(
        &self,
        instance: &InstanceConfig,
        record: &MonitorRecord,
        folder_name: &str,
    ) -> anyhow::Result<PathBuf> {
        if !is_path_safe(folder_name) {
            bail!("'{folder_name}' is not a safe folder name");
        }
        let root = self.instance_root(instance);
        let target = root.join(folder_name);

        let current = match record.folder.as_deref() {
            Some(folder) if folder != target => {
                if folder.parent() != Some(root.as_path()) {
                    bail!("{} is outside {}", folder.display(), root.display());
                }
                Some(folder.to_path_buf())
            }
            _ => None,
        };
        if record.folder.is_none()
            && tokio::fs::try_exists(target.join(&self.body_file)).await.unwrap_or(false)
        {
            bail!("{} already holds a monitor", target.display());
        }
        let working = current.clone().unwrap_or_else(|| target.clone());
        tokio::fs::create_dir_all(&working)
            .await
            .with_context(|| format!("Failed to create {}", working.display()))?;

        let stored = StoredMonitor {
            // Temporary identities never reach disk
            id: Some(
                record
                    .identity
                    .canonical()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_default(),
            ),
            version: record.version,
            monitor: record.body.to_value(),
        };
        write_atomic(&working.join(&self.body_file), &to_pretty_json(&stored)?).await?;
        if let Some(state) = &record.sync_state {
            write_atomic(&working.join(&self.state_file), &to_pretty_json(state)?).await?;
        }

        if let Some(from) = current {
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                bail!(
                    "cannot move {} to {}: target already exists",
                    from.display(),
                    target.display()
                );
            }
            tokio::fs::rename(&from, &target).await.with_context(|| {
                format!("Failed to move {} to {}", from.display(), target.display())
            })?;
            info!(from = %from.display(), to = %target.display(), "Relocated monitor folder");
        }

        debug!(folder = %target.display(), "Monitor written");
        Ok(target)
    }

    #[instrument(skip(self, instance), fields(instance = %instance.name, folder = %folder.display()))]
    async fn prune(&self, instance: &InstanceConfig, folder: &Path) -> anyhow::Result<()> {
        let root = self.instance_root(instance);
        if folder.parent() != Some(root.as_path()) {
            bail!("refusing to remove {}: not a folder of {}", folder.display(), root.display());
        }
        tokio::fs::remove_dir_all(folder)
            .await
            .with_context(|| format!("Failed to remove {}", folder.display()))?;
        info!("Removed duplicate monitor folder");
        Ok(())
    }
}
