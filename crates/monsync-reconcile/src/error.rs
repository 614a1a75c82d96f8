//! Error types for the reconciliation engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop pairing for a whole instance
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The remote side holds several monitors with one name; name-keyed
    /// folders cannot represent them
    #[error("remote monitors share the name '{name}' (ids: {})", .ids.join(", "))]
    DuplicateRemoteName { name: String, ids: Vec<String> },

    /// Two local folders claim the same canonical identity
    #[error("folders {} all claim identity {identity}", display_paths(.folders))]
    IdentityConflict {
        identity: String,
        folders: Vec<PathBuf>,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
