//! monsync Sync - local store and sync orchestration
//!
//! Provides:
//! - The filesystem [`ILocalStore`](monsync_core::ports::ILocalStore)
//!   (atomic body writes, folder relocation, dedup pruning)
//! - Retry with exponential backoff for reads and updates
//! - The sync orchestrator driving load, pairing, decision, confirmation
//!   and apply for every active instance
//!
//! ## Modules
//!
//! - [`engine`] - per-instance sync passes
//! - [`retry`] - transient-error retry helper
//! - [`store`] - filesystem adapter for the monitor tree

pub mod engine;
pub mod retry;
pub mod store;

use monsync_core::domain::FailureKind;
use monsync_core::ports::{GatewayError, GatewayErrorKind};
use monsync_reconcile::ReconcileError;
use thiserror::Error;

/// Errors that can occur during a sync pass
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network trouble that persisted through all retries
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The instance rejected the configured credentials
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A monitor document is malformed
    #[error("invalid monitor: {0}")]
    Validation(String),

    /// Several local folders claim one canonical identity
    #[error("identity conflict: {0}")]
    IdentityConflict(String),

    /// Reading or writing the local tree failed
    #[error("local write failed: {0}")]
    LocalWrite(String),

    /// Several remote monitors share one name
    #[error("{0}")]
    DuplicateRemoteName(String),

    /// The remote service refused a request or answered nonsense
    #[error("remote error: {0}")]
    Remote(String),
}

impl SyncError {
    /// Classify an error coming back from a remote gateway
    pub fn from_remote(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        match GatewayError::find(err).map(|g| g.kind) {
            Some(GatewayErrorKind::Transient) => Self::TransientNetwork(message),
            Some(GatewayErrorKind::Authorization) => Self::Authorization(message),
            Some(_) => Self::Remote(message),
            None if retry::is_transient_error(err) => Self::TransientNetwork(message),
            None => Self::Remote(message),
        }
    }

    /// Wrap an error coming back from the local store
    pub fn from_local(err: &anyhow::Error) -> Self {
        Self::LocalWrite(format!("{err:#}"))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Errors that end the pass for the whole instance
    pub fn is_instance_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_) | Self::Authorization(_) | Self::DuplicateRemoteName(_)
        )
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::TransientNetwork(_) => FailureKind::TransientNetwork,
            Self::Authorization(_) => FailureKind::Authorization,
            Self::Validation(_) => FailureKind::Validation,
            Self::IdentityConflict(_) => FailureKind::IdentityConflict,
            Self::LocalWrite(_) => FailureKind::LocalWrite,
            Self::DuplicateRemoteName(_) | Self::Remote(_) => FailureKind::Remote,
        }
    }
}

impl From<ReconcileError> for SyncError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::DuplicateRemoteName { .. } => Self::DuplicateRemoteName(err.to_string()),
            ReconcileError::IdentityConflict { .. } => Self::IdentityConflict(err.to_string()),
        }
    }
}
