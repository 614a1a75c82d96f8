//! Confirmation port (driving side of the confirmation gate)
//!
//! Maps the list of planned decisions to the subset the operator approves.
//! The console implementation lives in the CLI and waits on the operator;
//! the two stubs here make the orchestrator testable without a terminal.

use crate::domain::SyncDecision;

/// Port trait for operator approval
#[async_trait::async_trait]
pub trait IConfirmation: Send + Sync {
    /// Returns the indices (into `decisions`) that may be applied
    async fn confirm(&self, instance: &str, decisions: &[SyncDecision]) -> anyhow::Result<Vec<usize>>;
}

/// Approves every decision
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

#[async_trait::async_trait]
impl IConfirmation for ApproveAll {
    async fn confirm(&self, _instance: &str, decisions: &[SyncDecision]) -> anyhow::Result<Vec<usize>> {
        Ok((0..decisions.len()).collect())
    }
}

/// Declines every decision
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveNone;

#[async_trait::async_trait]
impl IConfirmation for ApproveNone {
    async fn confirm(&self, _instance: &str, _decisions: &[SyncDecision]) -> anyhow::Result<Vec<usize>> {
        Ok(Vec::new())
    }
}
