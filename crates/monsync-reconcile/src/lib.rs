//! monsync Reconcile - the reconciliation engine
//!
//! Provides:
//! - Pairing of local and remote monitors by identity, then by name
//! - Deterministic deduplication of local folders sharing a monitor name
//! - One sync decision per monitor, with change summaries for review
//! - Collision-free folder naming

pub mod diff;
pub mod engine;
pub mod error;
pub mod namer;
pub mod policy;
pub mod resolver;

pub use diff::summarize;
pub use engine::DiffEngine;
pub use error::ReconcileError;
pub use namer::FolderNamer;
pub use policy::DedupPolicy;
pub use resolver::{IdentityConflict, IdentityResolver, MonitorPair, Pairing, PrunedDuplicate};
