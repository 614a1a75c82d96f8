//! Domain layer
//!
//! Monitor records and identities, the decisions the reconciliation engine
//! produces, and the per-pass report consumed by the outer layers.

pub mod decision;
pub mod errors;
pub mod identity;
pub mod monitor;
pub mod names;
pub mod report;

pub use decision::{ChangeKind, ChangeSummary, FieldChange, IdentityFix, SyncAction, SyncDecision};
pub use errors::DomainError;
pub use identity::{MonitorIdentity, RemoteId, TempId};
pub use monitor::{Fingerprint, MonitorBody, MonitorRecord, Origin, SyncState, VOLATILE_FIELDS};
pub use names::{is_path_safe, sanitize_folder_name, UNSAFE_PATH_CHARS};
pub use report::{FailureKind, MonitorFailure, RunReport, SyncReport};
