//! Diff engine
//!
//! Turns each pair from the [`IdentityResolver`](crate::IdentityResolver)
//! into exactly one [`SyncDecision`].
//!
//! | local | remote | fingerprints | action |
//! |-------|--------|--------------|--------|
//! | yes   | no     | -            | create-remote |
//! | no    | yes    | -            | create-local |
//! | yes   | yes    | equal        | no-op, or reconcile-identity when the identity or folder is off |
//! | yes   | yes    | differ       | update-remote or update-local, see below |
//!
//! Local content is the source of truth. A pair whose content differs is
//! pulled (update-local) only when the local copy is known to be untouched
//! since the last sync while the remote moved on, or, without a sync
//! baseline, when the remote version counter is ahead of the local one.
//! Identity and folder fixes ride along with the content action and are
//! applied before it.
//!
//! Folders whose records relocate in the same plan count as free, so two
//! monitors that swapped folder names both reach their preferred folder in
//! one pass.

use std::collections::HashSet;

use monsync_core::domain::{IdentityFix, MonitorRecord, SyncAction, SyncDecision};
use tracing::debug;

use crate::diff::summarize;
use crate::namer::FolderNamer;
use crate::resolver::{MonitorPair, PrunedDuplicate};

/// Computes sync decisions for one instance
pub struct DiffEngine {
    /// Folder names present under the instance root
    existing: HashSet<String>,
    /// Present folders whose records move elsewhere in this plan
    vacating: HashSet<String>,
    /// Folder names handed out by this engine
    claimed: HashSet<String>,
}

impl DiffEngine {
    /// `existing_folders` must list every folder name present in the
    /// instance directory, including duplicates awaiting pruning.
    pub fn new<I, S>(existing_folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            existing: existing_folders.into_iter().map(Into::into).collect(),
            vacating: HashSet::new(),
            claimed: HashSet::new(),
        }
    }

    /// One decision per pair, followed by one prune decision per duplicate
    pub fn plan(&mut self, pairs: Vec<MonitorPair>, duplicates: Vec<PrunedDuplicate>) -> Vec<SyncDecision> {
        self.vacating = pairs
            .iter()
            .filter_map(|pair| pair.local.as_ref())
            .filter_map(|local| {
                let current = local.folder_name()?;
                (current != FolderNamer::preferred(local.name())).then(|| current.to_string())
            })
            .collect();

        let mut decisions: Vec<SyncDecision> = pairs.into_iter().map(|pair| self.decide(pair)).collect();

        for dup in duplicates {
            let kept = dup
                .kept_folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut decision = SyncDecision::new(Some(dup.record), None, SyncAction::Prune);
            decision.superseded_by = Some(kept);
            decisions.push(decision);
        }
        decisions
    }

    /// Decision for a single pair
    pub fn decide(&mut self, pair: MonitorPair) -> SyncDecision {
        let decision = match (pair.local, pair.remote) {
            (Some(local), None) => {
                let mut decision = SyncDecision::new(None, None, SyncAction::CreateRemote);
                decision.identity_fix.relocate_to = self.relocation(&local);
                decision.local = Some(local);
                decision
            }
            (None, Some(remote)) => {
                let folder = self.claim_folder(remote.name());
                let mut decision = SyncDecision::new(None, Some(remote), SyncAction::CreateLocal);
                decision.folder_name = Some(folder);
                decision
            }
            (Some(local), Some(remote)) => self.decide_matched(local, remote),
            // The resolver never yields an empty pair
            (None, None) => SyncDecision::new(None, None, SyncAction::NoOp),
        };
        debug!(decision = %decision.describe(), "Decided");
        decision
    }

    fn decide_matched(&mut self, local: MonitorRecord, remote: MonitorRecord) -> SyncDecision {
        let fix = IdentityFix {
            promote_to: remote
                .identity
                .canonical()
                .filter(|id| local.identity.canonical() != Some(*id))
                .cloned(),
            relocate_to: self.relocation(&local),
        };

        let mut decision = if local.fingerprint == remote.fingerprint {
            let action = if fix.is_empty() {
                SyncAction::NoOp
            } else {
                SyncAction::ReconcileIdentity
            };
            SyncDecision::new(None, None, action)
        } else {
            let (action, concurrent_edit) = Self::direction(&local, &remote);
            let changes = match action {
                SyncAction::UpdateLocal => summarize(&local.body, &remote.body),
                _ => summarize(&remote.body, &local.body),
            };
            let mut decision = SyncDecision::new(None, None, action);
            decision.concurrent_edit = concurrent_edit;
            decision.changes = Some(changes);
            decision
        };

        decision.identity_fix = fix;
        decision.local = Some(local);
        decision.remote = Some(remote);
        decision
    }

    /// Which way content flows for a pair whose fingerprints differ
    fn direction(local: &MonitorRecord, remote: &MonitorRecord) -> (SyncAction, bool) {
        // A baseline recorded for another identity says nothing about this pair
        let baseline = local
            .sync_state
            .as_ref()
            .filter(|state| remote.identity.canonical() == Some(&state.identity));

        match baseline {
            Some(state) => {
                let local_changed = state.fingerprint != local.fingerprint;
                let remote_changed = state.fingerprint != remote.fingerprint;
                match (local_changed, remote_changed) {
                    (false, true) => (SyncAction::UpdateLocal, false),
                    (true, true) => (SyncAction::UpdateRemote, true),
                    _ => (SyncAction::UpdateRemote, false),
                }
            }
            // Hand-made copy of a monitor that already exists remotely
            None if local.identity.is_temporary() => (SyncAction::UpdateRemote, true),
            None if remote.version > local.version => (SyncAction::UpdateLocal, false),
            None => (SyncAction::UpdateRemote, false),
        }
    }

    /// Occupied by a monitor that stays where it is, or already handed out
    fn is_taken(&self, folder: &str) -> bool {
        self.claimed.contains(folder) || (self.existing.contains(folder) && !self.vacating.contains(folder))
    }

    /// Target folder when a local record sits in a folder not named after it
    fn relocation(&mut self, local: &MonitorRecord) -> Option<String> {
        let current = local.folder_name()?.to_string();
        if current == FolderNamer::preferred(local.name()) {
            return None;
        }
        let target = FolderNamer::generate_unique(local.name(), |c| {
            if c == current {
                self.claimed.contains(c)
            } else {
                self.is_taken(c)
            }
        });
        self.claimed.insert(target.clone());
        (target != current).then_some(target)
    }

    fn claim_folder(&mut self, monitor_name: &str) -> String {
        let folder = FolderNamer::generate_unique(monitor_name, |c| self.is_taken(c));
        self.claimed.insert(folder.clone());
        folder
    }
}
