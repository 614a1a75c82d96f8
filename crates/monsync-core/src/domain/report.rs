//! Per-pass results
//!
//! [`SyncReport`] is what the orchestrator hands back for one instance:
//! counts per action, the list of per-monitor failures and, when the pass
//! could not run at all, the fatal error that stopped it.

use serde::Serialize;

use super::decision::SyncAction;

/// Classification of a per-monitor or per-instance failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TransientNetwork,
    Authorization,
    Validation,
    IdentityConflict,
    LocalWrite,
    Remote,
}

/// One monitor whose action could not be applied (or planned)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorFailure {
    pub monitor: String,
    pub identity: Option<String>,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of one sync pass over one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub instance: String,
    pub dry_run: bool,
    pub created_local: usize,
    pub created_remote: usize,
    pub updated_remote: usize,
    pub updated_local: usize,
    pub reconciled: usize,
    pub deduplicated: usize,
    pub no_op: usize,
    /// Decisions the operator declined
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<MonitorFailure>,
    /// Error that stopped the whole instance pass
    pub fatal: Option<String>,
}

impl SyncReport {
    pub fn new(instance: impl Into<String>, dry_run: bool) -> Self {
        Self {
            instance: instance.into(),
            dry_run,
            ..Default::default()
        }
    }

    /// Count one applied (or, in a dry run, planned) action
    pub fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::CreateRemote => self.created_remote += 1,
            SyncAction::CreateLocal => self.created_local += 1,
            SyncAction::UpdateRemote => self.updated_remote += 1,
            SyncAction::UpdateLocal => self.updated_local += 1,
            SyncAction::ReconcileIdentity => self.reconciled += 1,
            SyncAction::Prune => self.deduplicated += 1,
            SyncAction::NoOp => self.no_op += 1,
        }
    }

    pub fn record_failure(
        &mut self,
        monitor: impl Into<String>,
        identity: Option<String>,
        kind: FailureKind,
        reason: impl Into<String>,
    ) {
        self.failed += 1;
        self.failures.push(MonitorFailure {
            monitor: monitor.into(),
            identity,
            kind,
            reason: reason.into(),
        });
    }

    /// Number of create/update/reconcile/prune actions
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.created_local
            + self.created_remote
            + self.updated_remote
            + self.updated_local
            + self.reconciled
            + self.deduplicated
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

/// Reports for every instance processed in one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub instances: Vec<SyncReport>,
}

impl RunReport {
    /// True when any instance pass was stopped by a fatal error
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.instances.iter().any(SyncReport::is_fatal)
    }

    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.instances.iter().map(|r| r.failed).sum()
    }
}
