//! Identity resolution
//!
//! Pairs the local and remote records of one instance. Local folders are
//! keyed by name, remote monitors by service-assigned ID, so pairing runs
//! in phases:
//!
//! 1. Local folders sharing a monitor name are collapsed ([`DedupPolicy`]);
//!    the losers are returned for pruning, never dropped silently.
//! 2. Surviving folders that claim the same canonical ID are conflicts;
//!    only the first by path takes part in pairing.
//! 3. Canonical local identities are matched to remote IDs.
//! 4. Whatever is left is matched by monitor name.
//!
//! Anything still unmatched is paired with an absent counterpart. A pair
//! always has at least one side.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use monsync_core::domain::{MonitorRecord, RemoteId};
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::policy::DedupPolicy;

/// A local record, a remote record, or both
#[derive(Debug, Clone)]
pub struct MonitorPair {
    pub local: Option<MonitorRecord>,
    pub remote: Option<MonitorRecord>,
}

impl MonitorPair {
    #[must_use]
    pub fn name(&self) -> &str {
        self.local
            .as_ref()
            .or(self.remote.as_ref())
            .map(MonitorRecord::name)
            .unwrap_or_default()
    }
}

/// A local folder superseded by another folder with the same monitor name
#[derive(Debug, Clone)]
pub struct PrunedDuplicate {
    pub record: MonitorRecord,
    pub kept_folder: PathBuf,
}

/// A local folder whose canonical identity is already claimed by another
#[derive(Debug, Clone)]
pub struct IdentityConflict {
    pub record: MonitorRecord,
    pub identity: RemoteId,
    pub kept_folder: PathBuf,
}

impl IdentityConflict {
    pub fn to_error(&self) -> ReconcileError {
        let mut folders = vec![self.kept_folder.clone()];
        folders.extend(self.record.folder.clone());
        ReconcileError::IdentityConflict {
            identity: self.identity.to_string(),
            folders,
        }
    }
}

/// Result of pairing one instance
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    /// Sorted by monitor name
    pub pairs: Vec<MonitorPair>,
    pub duplicates: Vec<PrunedDuplicate>,
    pub conflicts: Vec<IdentityConflict>,
}

/// Pairs local and remote monitor records
pub struct IdentityResolver;

impl IdentityResolver {
    /// Pair the records of one instance
    ///
    /// # Errors
    /// [`ReconcileError::DuplicateRemoteName`] when two remote monitors share
    /// a name. Nothing is paired in that case.
    pub fn pair(
        local: Vec<MonitorRecord>,
        remote: Vec<MonitorRecord>,
    ) -> Result<Pairing, ReconcileError> {
        Self::pair_matching(local, remote, None)
    }

    /// Pair every record, then keep the pairs where either side matches
    /// `filter` (case-insensitive substring of the monitor name)
    ///
    /// Pairing runs on the full sets so a monitor renamed on one side stays
    /// bound to its counterpart. Duplicates and conflicts are kept when
    /// their own record matches.
    ///
    /// # Errors
    /// [`ReconcileError::DuplicateRemoteName`] when two remote monitors share
    /// a name and a record with that name takes part in the pass.
    pub fn pair_matching(
        local: Vec<MonitorRecord>,
        remote: Vec<MonitorRecord>,
        filter: Option<&str>,
    ) -> Result<Pairing, ReconcileError> {
        let duplicated = Self::duplicate_remote_names(&remote);
        let mut pairing = Self::pair_all(local, remote);

        if filter.is_some() {
            pairing.pairs.retain(|pair| {
                pair.local.as_ref().is_some_and(|r| r.matches_filter(filter))
                    || pair.remote.as_ref().is_some_and(|r| r.matches_filter(filter))
            });
            pairing.duplicates.retain(|dup| dup.record.matches_filter(filter));
            pairing.conflicts.retain(|conflict| conflict.record.matches_filter(filter));
        }

        let participating = |name: &str| {
            pairing
                .pairs
                .iter()
                .any(|pair| pair.remote.as_ref().is_some_and(|r| r.name() == name))
        };
        match duplicated.into_iter().find(|(name, _)| participating(name)) {
            Some((name, ids)) => Err(ReconcileError::DuplicateRemoteName { name, ids }),
            None => Ok(pairing),
        }
    }

    fn pair_all(local: Vec<MonitorRecord>, remote: Vec<MonitorRecord>) -> Pairing {
        let (survivors, duplicates) = Self::deduplicate(local);
        let (survivors, conflicts) = Self::split_identity_conflicts(survivors);

        let mut slots: Vec<Option<MonitorRecord>> = remote.into_iter().map(Some).collect();
        let mut by_id: HashMap<RemoteId, usize> = HashMap::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (i, record) in slots.iter().enumerate() {
            if let Some(record) = record {
                if let Some(id) = record.identity.canonical() {
                    by_id.insert(id.clone(), i);
                }
                by_name.insert(record.name().to_string(), i);
            }
        }

        let mut pairs = Vec::new();
        let mut unmatched = Vec::new();

        // Phase: identity
        for record in survivors {
            let slot = record
                .identity
                .canonical()
                .and_then(|id| by_id.get(id))
                .copied();
            match slot.and_then(|i| slots[i].take()) {
                Some(remote) => pairs.push(MonitorPair {
                    local: Some(record),
                    remote: Some(remote),
                }),
                None => unmatched.push(record),
            }
        }

        // Phase: name
        for record in unmatched {
            let slot = by_name.get(record.name()).copied();
            match slot.and_then(|i| slots[i].take()) {
                Some(remote) => {
                    debug!(
                        name = %record.name(),
                        local = %record.identity,
                        remote = %remote.identity,
                        "Paired by name"
                    );
                    pairs.push(MonitorPair {
                        local: Some(record),
                        remote: Some(remote),
                    });
                }
                None => pairs.push(MonitorPair {
                    local: Some(record),
                    remote: None,
                }),
            }
        }

        for remote in slots.into_iter().flatten() {
            pairs.push(MonitorPair {
                local: None,
                remote: Some(remote),
            });
        }

        pairs.sort_by(|a, b| a.name().cmp(b.name()));

        Pairing {
            pairs,
            duplicates,
            conflicts,
        }
    }

    /// Remote names held by more than one monitor, with their IDs, by name
    fn duplicate_remote_names(remote: &[MonitorRecord]) -> Vec<(String, Vec<String>)> {
        let mut by_name: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for record in remote {
            by_name
                .entry(record.name())
                .or_default()
                .push(record.identity.as_str().to_string());
        }
        by_name
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, ids)| (name.to_string(), ids))
            .collect()
    }

    /// Collapse local records sharing a name into one canonical record
    fn deduplicate(mut local: Vec<MonitorRecord>) -> (Vec<MonitorRecord>, Vec<PrunedDuplicate>) {
        local.sort_by(|a, b| a.folder.cmp(&b.folder));

        let mut groups: BTreeMap<String, Vec<MonitorRecord>> = BTreeMap::new();
        for record in local {
            groups.entry(record.name().to_string()).or_default().push(record);
        }

        let mut survivors = Vec::new();
        let mut duplicates = Vec::new();
        for (name, mut group) in groups {
            if group.len() == 1 {
                survivors.append(&mut group);
                continue;
            }
            let refs: Vec<&MonitorRecord> = group.iter().collect();
            let keep = DedupPolicy::select_canonical(&refs).unwrap_or(0);
            let kept = group.swap_remove(keep);
            let kept_folder = kept.folder.clone().unwrap_or_default();
            warn!(
                name = %name,
                kept = %kept_folder.display(),
                duplicates = group.len(),
                "Several local folders hold the same monitor"
            );
            group.sort_by(|a, b| a.folder.cmp(&b.folder));
            duplicates.extend(group.into_iter().map(|record| PrunedDuplicate {
                record,
                kept_folder: kept_folder.clone(),
            }));
            survivors.push(kept);
        }

        survivors.sort_by(|a, b| a.folder.cmp(&b.folder));
        (survivors, duplicates)
    }

    /// Keep the first folder (by path) per canonical identity
    fn split_identity_conflicts(
        survivors: Vec<MonitorRecord>,
    ) -> (Vec<MonitorRecord>, Vec<IdentityConflict>) {
        let mut owners: HashMap<RemoteId, PathBuf> = HashMap::new();
        let mut kept = Vec::new();
        let mut conflicts = Vec::new();

        for record in survivors {
            let Some(id) = record.identity.canonical().cloned() else {
                kept.push(record);
                continue;
            };
            match owners.get(&id) {
                Some(owner) => {
                    warn!(
                        identity = %id,
                        folder = ?record.folder,
                        owner = %owner.display(),
                        "Local folders claim the same identity"
                    );
                    conflicts.push(IdentityConflict {
                        kept_folder: owner.clone(),
                        identity: id,
                        record,
                    });
                }
                None => {
                    owners.insert(id, record.folder.clone().unwrap_or_default());
                    kept.push(record);
                }
            }
        }
        (kept, conflicts)
    }
}
