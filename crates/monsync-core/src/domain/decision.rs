//! Sync decisions
//!
//! The reconciliation engine turns every (local, remote) pair into exactly
//! one [`SyncDecision`]. Decisions are plain data: they can be rendered,
//! confirmed or skipped before anything touches either store.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::Value;

use super::identity::RemoteId;
use super::monitor::MonitorRecord;

/// The single action chosen for one monitor in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Local only: create it remotely, then promote the local identity
    CreateRemote,
    /// Remote only: materialize a new local folder
    CreateLocal,
    /// Push local content to the remote monitor
    UpdateRemote,
    /// Pull remote content into the local folder
    UpdateLocal,
    /// Content matches; only the stored identity or folder needs fixing
    ReconcileIdentity,
    /// Remove a local folder superseded by deduplication
    Prune,
    NoOp,
}

impl SyncAction {
    /// Whether applying the action changes either store
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SyncAction::NoOp)
    }

    /// Whether the action discards content and must be confirmed
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(self, SyncAction::Prune)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SyncAction::CreateRemote => "create-remote",
            SyncAction::CreateLocal => "create-local",
            SyncAction::UpdateRemote => "update-remote",
            SyncAction::UpdateLocal => "update-local",
            SyncAction::ReconcileIdentity => "reconcile-identity",
            SyncAction::Prune => "prune",
            SyncAction::NoOp => "no-op",
        }
    }
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity or location corrections applied before any content action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityFix {
    /// Replace a temporary or stale local identity with this canonical one
    pub promote_to: Option<RemoteId>,
    /// Move the local folder to this directory name
    pub relocate_to: Option<String>,
}

impl IdentityFix {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promote_to.is_none() && self.relocate_to.is_none()
    }
}

/// One planned action with the records it concerns
#[derive(Debug, Clone)]
pub struct SyncDecision {
    pub local: Option<MonitorRecord>,
    pub remote: Option<MonitorRecord>,
    pub action: SyncAction,
    pub identity_fix: IdentityFix,
    /// Target directory name for create-local
    pub folder_name: Option<String>,
    /// Both sides changed since the last sync
    pub concurrent_edit: bool,
    /// Human-readable before/after for content actions
    pub changes: Option<ChangeSummary>,
    /// Folder that survives when this decision prunes a duplicate
    pub superseded_by: Option<String>,
}

impl SyncDecision {
    pub fn new(local: Option<MonitorRecord>, remote: Option<MonitorRecord>, action: SyncAction) -> Self {
        Self {
            local,
            remote,
            action,
            identity_fix: IdentityFix::default(),
            folder_name: None,
            concurrent_edit: false,
            changes: None,
            superseded_by: None,
        }
    }

    /// Monitor name, preferring the local copy
    #[must_use]
    pub fn name(&self) -> &str {
        self.local
            .as_ref()
            .or(self.remote.as_ref())
            .map(MonitorRecord::name)
            .unwrap_or_default()
    }

    /// Best known identity for reports
    #[must_use]
    pub fn identity_label(&self) -> Option<String> {
        self.remote
            .as_ref()
            .or(self.local.as_ref())
            .map(|r| r.identity.to_string())
    }

    /// Folder this decision writes into that the record does not occupy
    /// yet: the create-local folder or the relocation target
    #[must_use]
    pub fn destination_folder(&self) -> Option<&str> {
        match self.action {
            SyncAction::CreateLocal => self.folder_name.as_deref(),
            SyncAction::Prune | SyncAction::NoOp => None,
            _ => self.identity_fix.relocate_to.as_deref(),
        }
    }

    /// One-line description for logs and prompts
    #[must_use]
    pub fn describe(&self) -> String {
        let mut line = format!("{} '{}'", self.action, self.name());
        if let Some(id) = &self.identity_fix.promote_to {
            line.push_str(&format!(", bind to id {id}"));
        }
        if let Some(folder) = &self.identity_fix.relocate_to {
            line.push_str(&format!(", move folder to '{folder}'"));
        }
        if let Some(folder) = &self.folder_name {
            if self.action == SyncAction::CreateLocal {
                line.push_str(&format!(" in folder '{folder}'"));
            }
        }
        if let Some(kept) = &self.superseded_by {
            line.push_str(&format!(" (duplicate of '{kept}')"));
        }
        if self.concurrent_edit {
            line.push_str(" [changed on both sides]");
        }
        line
    }
}

// ============================================================================
// Change summaries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// One differing leaf, addressed by a dotted path (`triggers[0].name`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub path: String,
    pub kind: ChangeKind,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Structural difference between two monitor bodies
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub changes: Vec<FieldChange>,
}

impl ChangeSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Multi-line rendering used by the confirmation prompt
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for change in &self.changes {
            let line = match change.kind {
                ChangeKind::Added => format!("+ {}: {}", change.path, show(&change.after)),
                ChangeKind::Removed => format!("- {}: {}", change.path, show(&change.before)),
                ChangeKind::Changed => format!(
                    "~ {}: {} -> {}",
                    change.path,
                    show(&change.before),
                    show(&change.after)
                ),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn show(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "null".to_string())
}
