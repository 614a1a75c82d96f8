//! Remote gateway port (driven/secondary port)
//!
//! The remote side of a sync: the monitor collection of one alerting
//! service deployment.
//!
//! ## Design Notes
//!
//! - A gateway is bound to one instance; [`IGatewayProvider`] opens it with
//!   already-resolved credentials. The core never reads credential sources.
//! - Adapters return `anyhow::Error` wrapping a [`GatewayError`] so callers
//!   can tell retryable failures from authorization or rejection without
//!   depending on the adapter crate.
//! - `create` is not idempotent. Callers must never retry it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::InstanceConfig;
use crate::domain::{MonitorBody, MonitorRecord, RemoteId};

/// Basic-auth credentials for one instance
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Coarse classification of a gateway failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection problems, timeouts, throttling, 5xx
    Transient,
    /// Credentials rejected (401/403)
    Authorization,
    NotFound,
    /// The service refused the request (other 4xx)
    Rejected,
    /// The service answered with something unparseable
    InvalidResponse,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayErrorKind::Transient => "transient network error",
            GatewayErrorKind::Authorization => "authorization failed",
            GatewayErrorKind::NotFound => "not found",
            GatewayErrorKind::Rejected => "request rejected",
            GatewayErrorKind::InvalidResponse => "invalid response",
        };
        f.write_str(s)
    }
}

/// Error carried inside `anyhow::Error` by gateway adapters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Finds a `GatewayError` anywhere in an error chain
    #[must_use]
    pub fn find(err: &anyhow::Error) -> Option<&GatewayError> {
        err.chain().find_map(|cause| cause.downcast_ref::<GatewayError>())
    }
}

/// Port trait for the remote monitor collection of one instance
#[async_trait::async_trait]
pub trait IRemoteGateway: Send + Sync {
    /// Every monitor of the instance, with volatile fields normalized
    async fn list_all(&self) -> anyhow::Result<Vec<MonitorRecord>>;

    /// One monitor by canonical identity
    async fn get(&self, id: &RemoteId) -> anyhow::Result<MonitorRecord>;

    /// Creates a monitor and returns the identity the service assigned
    async fn create(&self, body: &MonitorBody) -> anyhow::Result<RemoteId>;

    /// Replaces the body of an existing monitor
    async fn update(&self, id: &RemoteId, body: &MonitorBody) -> anyhow::Result<()>;
}

/// Opens gateways for configured instances
pub trait IGatewayProvider: Send + Sync {
    fn connect(&self, instance: &InstanceConfig) -> anyhow::Result<Arc<dyn IRemoteGateway>>;
}
