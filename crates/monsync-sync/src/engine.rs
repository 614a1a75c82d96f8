//! Sync orchestrator
//!
//! One pass per instance:
//!
//! ```text
//! LOADING -> PAIRING -> DECIDING -> dry run: REPORT
//!                                -> live:    CONFIRM -> APPLYING -> DONE
//! ```
//!
//! Instances are processed one after another. Failures of a single monitor
//! are recorded in the [`SyncReport`] and the pass moves on; errors that
//! make the instance unusable (unreachable, unauthorized, duplicate remote
//! names) end that instance's pass and mark the report fatal. Applied
//! decisions are never rolled back.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use monsync_core::config::InstanceConfig;
use monsync_core::domain::{
    FailureKind, IdentityFix, MonitorFailure, MonitorIdentity, MonitorRecord, Origin, RemoteId,
    RunReport, SyncAction, SyncDecision, SyncReport, SyncState, TempId,
};
use monsync_core::ports::{IConfirmation, IGatewayProvider, ILocalStore, IRemoteGateway};
use monsync_reconcile::{DiffEngine, FolderNamer, IdentityResolver};
use tracing::{debug, error, info, instrument, warn};

use crate::retry::{with_retry, RetryPolicy};
use crate::SyncError;

/// Operator switches for a pass
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute and report decisions without applying any
    pub dry_run: bool,
    /// Skip confirmation; every decision is approved
    pub force: bool,
    /// Case-insensitive substring on monitor names
    pub filter: Option<String>,
    pub retry: RetryPolicy,
}

/// Decisions computed for one instance, ready to confirm and apply
pub struct InstancePlan {
    gateway: Arc<dyn IRemoteGateway>,
    /// Actionable decisions and no-ops, in pairing order with prunes last
    pub decisions: Vec<SyncDecision>,
    /// Monitors that could not take part in the pass
    pub failures: Vec<MonitorFailure>,
}

impl std::fmt::Debug for InstancePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePlan")
            .field("decisions", &self.decisions.len())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Runs sync passes over configured instances
pub struct SyncOrchestrator {
    store: Arc<dyn ILocalStore>,
    gateways: Arc<dyn IGatewayProvider>,
    confirmation: Arc<dyn IConfirmation>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn ILocalStore>,
        gateways: Arc<dyn IGatewayProvider>,
        confirmation: Arc<dyn IConfirmation>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            gateways,
            confirmation,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync every given instance in order
    pub async fn run<'a, I>(&self, instances: I) -> RunReport
    where
        I: IntoIterator<Item = &'a InstanceConfig>,
    {
        let mut run = RunReport::default();
        for instance in instances {
            run.instances.push(self.sync_instance(instance).await);
        }
        run
    }

    /// Load both sides, pair them and decide, without mutating anything
    ///
    /// # Errors
    /// Any error here is fatal for the instance: the gateway could not be
    /// built, one side could not be read, or the remote side holds
    /// duplicate names.
    #[instrument(skip(self, instance), fields(instance = %instance.name))]
    pub async fn plan(&self, instance: &InstanceConfig) -> Result<InstancePlan, SyncError> {
        let gateway = self
            .gateways
            .connect(instance)
            .map_err(|e| SyncError::Remote(format!("{e:#}")))?;

        // LOADING
        let (local, remote) = tokio::join!(
            self.store.load_all(instance),
            with_retry(&self.options.retry, "list monitors", || gateway.list_all()),
        );
        let snapshot = local.map_err(|e| SyncError::from_local(&e))?;
        let remote = remote.map_err(|e| SyncError::from_remote(&e))?;
        info!(
            local = snapshot.records.len(),
            remote = remote.len(),
            unreadable = snapshot.failures.len(),
            "Loaded monitors"
        );

        let mut failures: Vec<MonitorFailure> = Vec::new();
        let mut blocked_folders = HashSet::new();
        let mut folder_names: Vec<String> = snapshot
            .records
            .iter()
            .filter_map(|r| r.folder_name().map(str::to_string))
            .collect();
        for failure in &snapshot.failures {
            let name = failure
                .folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            folder_names.push(name.clone());
            blocked_folders.insert(name.clone());
            failures.push(MonitorFailure {
                monitor: name,
                identity: None,
                kind: failure.kind,
                reason: failure.reason.clone(),
            });
        }

        // PAIRING
        let filter = self.options.filter.as_deref();
        let mut pairing = IdentityResolver::pair_matching(snapshot.records, remote, filter)?;
        for conflict in &pairing.conflicts {
            let err = SyncError::from(conflict.to_error());
            warn!(monitor = %conflict.record.name(), error = %err, "Identity conflict");
            failures.push(MonitorFailure {
                monitor: conflict.record.name().to_string(),
                identity: Some(conflict.identity.to_string()),
                kind: FailureKind::IdentityConflict,
                reason: err.to_string(),
            });
        }

        // A remote monitor whose folder exists but cannot be read waits until
        // the folder is fixed, instead of being materialized next to it
        pairing.pairs.retain(|pair| match (&pair.local, &pair.remote) {
            (None, Some(remote)) => {
                let blocked = blocked_folders.contains(&FolderNamer::preferred(remote.name()));
                if blocked {
                    info!(monitor = %remote.name(), "Folder is unreadable, not creating a local copy");
                }
                !blocked
            }
            _ => true,
        });

        // DECIDING
        let mut engine = DiffEngine::new(folder_names);
        let decisions = engine.plan(pairing.pairs, pairing.duplicates);
        debug!(decisions = decisions.len(), "Planned");

        Ok(InstancePlan {
            gateway,
            decisions,
            failures,
        })
    }

    /// Full pass for one instance
    #[instrument(skip(self, instance), fields(instance = %instance.name, dry_run = self.options.dry_run))]
    pub async fn sync_instance(&self, instance: &InstanceConfig) -> SyncReport {
        let mut report = SyncReport::new(&instance.name, self.options.dry_run);

        let plan = match self.plan(instance).await {
            Ok(plan) => plan,
            Err(err) => {
                error!(error = %err, "Instance pass aborted");
                report.fatal = Some(err.to_string());
                return report;
            }
        };

        for failure in plan.failures {
            report.record_failure(failure.monitor, failure.identity, failure.kind, failure.reason);
        }

        let (no_ops, mut pending): (Vec<_>, Vec<_>) = plan
            .decisions
            .into_iter()
            .partition(|d| d.action == SyncAction::NoOp);
        report.no_op += no_ops.len();

        if pending.is_empty() {
            info!("Nothing to do");
            return report;
        }

        if self.options.dry_run {
            for decision in &pending {
                info!(decision = %decision.describe(), "Would apply");
                report.record(decision.action);
            }
            return report;
        }

        // CONFIRM
        let approved: HashSet<usize> = if self.options.force {
            (0..pending.len()).collect()
        } else {
            match self.confirmation.confirm(&instance.name, &pending).await {
                Ok(indices) => indices.into_iter().collect(),
                Err(err) => {
                    error!(error = %err, "Confirmation failed");
                    report.fatal = Some(format!("confirmation failed: {err:#}"));
                    return report;
                }
            }
        };

        // APPLYING
        let mut stopped = false;
        for index in 0..pending.len() {
            if stopped || !approved.contains(&index) {
                report.skipped += 1;
                continue;
            }
            let result = match self.vacate_destination(instance, &mut pending, index, &approved).await {
                Ok(()) => self.apply(instance, plan.gateway.as_ref(), &pending[index]).await,
                Err(err) => Err(err),
            };
            let decision = &pending[index];
            match result {
                Ok(()) => {
                    info!(decision = %decision.describe(), "Applied");
                    report.record(decision.action);
                }
                Err(err) => {
                    warn!(decision = %decision.describe(), error = %err, "Action failed");
                    report.record_failure(
                        decision.name(),
                        decision.identity_label(),
                        err.failure_kind(),
                        err.to_string(),
                    );
                    if err.is_instance_fatal() {
                        error!(error = %err, "Stopping pass for this instance");
                        report.fatal = Some(err.to_string());
                        stopped = true;
                    }
                }
            }
        }

        info!(
            changes = report.total_changes(),
            failed = report.failed,
            skipped = report.skipped,
            "Instance pass finished"
        );
        report
    }

    /// Apply one decision; identity and folder fixes go before content
    async fn apply(
        &self,
        instance: &InstanceConfig,
        gateway: &dyn IRemoteGateway,
        decision: &SyncDecision,
    ) -> Result<(), SyncError> {
        match decision.action {
            SyncAction::NoOp => Ok(()),

            SyncAction::CreateRemote => {
                let local = self
                    .fix_identity(instance, required(&decision.local, decision)?, &decision.identity_fix)
                    .await?;
                // Never retried: a lost response would create a second monitor
                let id = gateway
                    .create(&local.body.prepare_for_create())
                    .await
                    .map_err(|e| SyncError::from_remote(&e))?;
                info!(monitor = %local.name(), id = %id, "Created remote monitor");
                self.refresh_local(instance, gateway, local, id).await
            }

            SyncAction::UpdateRemote => {
                if decision.concurrent_edit {
                    warn!(monitor = %decision.name(), "Both sides changed, local copy wins");
                }
                let local = self
                    .fix_identity(instance, required(&decision.local, decision)?, &decision.identity_fix)
                    .await?;
                let id = match local.identity.canonical() {
                    Some(id) => id.clone(),
                    None => remote_id(decision)?,
                };
                let body = local.body.prepare_for_update();
                with_retry(&self.options.retry, "update monitor", || gateway.update(&id, &body))
                    .await
                    .map_err(|e| SyncError::from_remote(&e))?;
                self.refresh_local(instance, gateway, local, id).await
            }

            SyncAction::UpdateLocal | SyncAction::ReconcileIdentity => {
                let local = required(&decision.local, decision)?;
                let remote = required(&decision.remote, decision)?;
                let folder = decision
                    .identity_fix
                    .relocate_to
                    .clone()
                    .unwrap_or_else(|| folder_of(local));
                self.write(instance, &materialize(remote, local.folder.clone()), &folder)
                    .await
            }

            SyncAction::CreateLocal => {
                let remote = required(&decision.remote, decision)?;
                let folder = decision
                    .folder_name
                    .clone()
                    .unwrap_or_else(|| FolderNamer::preferred(remote.name()));
                self.write(instance, &materialize(remote, None), &folder).await
            }

            SyncAction::Prune => {
                let local = required(&decision.local, decision)?;
                let folder = local
                    .folder
                    .as_deref()
                    .ok_or_else(|| SyncError::LocalWrite(format!("'{}' has no folder", local.name())))?;
                info!(
                    folder = %folder.display(),
                    kept = decision.superseded_by.as_deref().unwrap_or_default(),
                    "Pruning duplicate folder"
                );
                self.store
                    .prune(instance, folder)
                    .await
                    .map_err(|e| SyncError::from_local(&e))
            }
        }
    }

    /// Moves a later approved relocation out of the folder this decision
    /// writes into. The moved record keeps a temporary folder name until
    /// its own decision applies.
    async fn vacate_destination(
        &self,
        instance: &InstanceConfig,
        pending: &mut [SyncDecision],
        index: usize,
        approved: &HashSet<usize>,
    ) -> Result<(), SyncError> {
        let Some(target) = pending[index].destination_folder().map(str::to_string) else {
            return Ok(());
        };
        let occupant = (index + 1..pending.len()).find(|&later| {
            let decision = &pending[later];
            approved.contains(&later)
                && decision.identity_fix.relocate_to.is_some()
                && decision.local.as_ref().and_then(MonitorRecord::folder_name) == Some(target.as_str())
        });
        let Some(later) = occupant else {
            return Ok(());
        };
        let Some(local) = pending[later].local.as_mut() else {
            return Ok(());
        };

        let staging = TempId::generate().to_string();
        debug!(folder = %target, staging = %staging, "Moving folder aside");
        let path = self
            .store
            .write(instance, local, &staging)
            .await
            .map_err(|e| SyncError::from_local(&e))?;
        local.folder = Some(path);
        Ok(())
    }

    /// Writes promotion and relocation to disk before any content action
    async fn fix_identity(
        &self,
        instance: &InstanceConfig,
        local: &MonitorRecord,
        fix: &IdentityFix,
    ) -> Result<MonitorRecord, SyncError> {
        let mut record = local.clone();
        if fix.is_empty() {
            return Ok(record);
        }
        if let Some(id) = &fix.promote_to {
            debug!(monitor = %record.name(), from = %record.identity, to = %id, "Promoting identity");
            record.identity = MonitorIdentity::Canonical(id.clone());
        }
        let folder = fix.relocate_to.clone().unwrap_or_else(|| folder_of(&record));
        let path = self
            .store
            .write(instance, &record, &folder)
            .await
            .map_err(|e| SyncError::from_local(&e))?;
        record.folder = Some(path);
        Ok(record)
    }

    /// Re-read the monitor after a remote mutation and store it locally
    /// together with its new sync baseline
    async fn refresh_local(
        &self,
        instance: &InstanceConfig,
        gateway: &dyn IRemoteGateway,
        local: MonitorRecord,
        id: RemoteId,
    ) -> Result<(), SyncError> {
        let folder = folder_of(&local);
        let record = match with_retry(&self.options.retry, "fetch monitor", || gateway.get(&id)).await {
            Ok(remote) => materialize(&remote, local.folder.clone()),
            Err(err) => {
                // The remote side is done; at least keep the new identity
                let reason = format!("{err:#}");
                warn!(id = %id, error = %reason, "Could not re-read monitor, keeping local body");
                let mut record = local;
                record.identity = MonitorIdentity::Canonical(id.clone());
                record
            }
        };
        self.write(instance, &record, &folder).await.map_err(|err| {
            error!(id = %id, "Remote monitor saved but local copy could not be updated");
            err
        })
    }

    async fn write(
        &self,
        instance: &InstanceConfig,
        record: &MonitorRecord,
        folder: &str,
    ) -> Result<(), SyncError> {
        self.store
            .write(instance, record, folder)
            .await
            .map(|_| ())
            .map_err(|e| SyncError::from_local(&e))
    }
}

/// Local copy of a remote record, carrying its sync baseline
fn materialize(remote: &MonitorRecord, folder: Option<PathBuf>) -> MonitorRecord {
    let state = SyncState::from_remote(remote);
    MonitorRecord {
        origin: Origin::Local,
        folder,
        ..remote.clone()
    }
    .with_sync_state(state)
}

fn folder_of(record: &MonitorRecord) -> String {
    record
        .folder_name()
        .map(str::to_string)
        .unwrap_or_else(|| FolderNamer::preferred(record.name()))
}

fn required<'a>(
    side: &'a Option<MonitorRecord>,
    decision: &SyncDecision,
) -> Result<&'a MonitorRecord, SyncError> {
    side.as_ref().ok_or_else(|| {
        SyncError::Validation(format!("{} decision for '{}' lacks a record", decision.action, decision.name()))
    })
}

fn remote_id(decision: &SyncDecision) -> Result<RemoteId, SyncError> {
    decision
        .remote
        .as_ref()
        .and_then(|r| r.identity.canonical())
        .cloned()
        .ok_or_else(|| SyncError::Validation(format!("no remote identity for '{}'", decision.name())))
}
