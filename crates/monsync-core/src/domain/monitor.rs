//! Monitor records
//!
//! A [`MonitorRecord`] is one monitor as observed on one side of a sync: its
//! identity, the service version counter, the document body and a content
//! fingerprint used for change detection.
//!
//! ## Body representation
//!
//! [`MonitorBody`] types the handful of fields the engine reasons about
//! (`name`, `monitor_type`, `enabled`, `inputs`, `triggers`) and keeps every
//! other field verbatim in an extension map, so a document read from either
//! side is written back without losing fields this tool does not know.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::errors::DomainError;
use super::identity::{MonitorIdentity, RemoteId};

/// Server-managed fields that change without a user edit
///
/// They are ignored by fingerprints and change summaries.
pub const VOLATILE_FIELDS: &[&str] = &["last_update_time", "enabled_time"];

/// Fields the service rejects or overwrites on create
const CREATE_STRIPPED_FIELDS: &[&str] = &["enabled_time", "last_update_time", "data_sources", "owner"];

// ============================================================================
// MonitorBody
// ============================================================================

/// The monitor document itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorBody {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<Value>>,

    /// Every field not listed above, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MonitorBody {
    /// A minimal body with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            monitor_type: None,
            enabled: None,
            inputs: None,
            triggers: None,
            extra: Map::new(),
        }
    }

    /// Parse a body from an arbitrary JSON value
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidMonitor`] if the value is not an object
    /// with a non-empty string `name`.
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        let body: Self = serde_json::from_value(value)
            .map_err(|e| DomainError::InvalidMonitor(e.to_string()))?;
        if body.name.trim().is_empty() {
            return Err(DomainError::InvalidMonitor(
                "monitor name cannot be empty".to_string(),
            ));
        }
        Ok(body)
    }

    /// The body as a plain JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        // Serializing a struct of Values into a Value cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The body as a JSON value without [`VOLATILE_FIELDS`]
    #[must_use]
    pub fn comparable_value(&self) -> Value {
        let mut value = self.to_value();
        if let Value::Object(map) = &mut value {
            for field in VOLATILE_FIELDS {
                map.remove(*field);
            }
        }
        value
    }

    /// Deterministic content hash over the comparable value
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.comparable_value())
    }

    /// Structural equality ignoring volatile fields
    #[must_use]
    pub fn same_content(&self, other: &MonitorBody) -> bool {
        self.comparable_value() == other.comparable_value()
    }

    /// Copy of the body suitable for an update request
    #[must_use]
    pub fn prepare_for_update(&self) -> MonitorBody {
        let mut body = self.clone();
        for field in VOLATILE_FIELDS {
            body.extra.remove(*field);
        }
        body
    }

    /// Copy of the body suitable for a create request
    ///
    /// Drops server-owned fields and the `id` of every trigger and trigger
    /// action; a create must not carry identifiers from another monitor.
    #[must_use]
    pub fn prepare_for_create(&self) -> MonitorBody {
        let mut body = self.clone();
        for field in CREATE_STRIPPED_FIELDS {
            body.extra.remove(*field);
        }
        if let Some(triggers) = body.triggers.as_mut() {
            for trigger in triggers.iter_mut() {
                strip_trigger_ids(trigger);
            }
        }
        body
    }
}

/// Triggers are wrapped as `{"<kind>_trigger": {...}}`, e.g. `query_level_trigger`
fn strip_trigger_ids(trigger: &mut Value) {
    let Value::Object(wrapper) = trigger else {
        return;
    };
    for (kind, inner) in wrapper.iter_mut() {
        if !kind.ends_with("_trigger") {
            continue;
        }
        let Value::Object(inner) = inner else {
            continue;
        };
        inner.remove("id");
        if let Some(Value::Array(actions)) = inner.get_mut("actions") {
            for action in actions.iter_mut() {
                if let Value::Object(action) = action {
                    action.remove("id");
                }
            }
        }
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// SHA-256 over the compact JSON serialization of a value
///
/// `serde_json` objects keep their keys sorted, so key order in the source
/// document does not affect the hash and two structurally equal bodies
/// always share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn of(value: &Value) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(value.to_string().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for logs and tables
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SyncState
// ============================================================================

/// What a monitor looked like right after its last successful sync
///
/// Stored next to the local body. Lets the diff engine tell which side
/// changed since then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub identity: RemoteId,
    pub version: i64,
    pub fingerprint: Fingerprint,
    pub synced_at: DateTime<Utc>,
}

impl SyncState {
    /// Baseline taken from a freshly read remote record
    ///
    /// Returns `None` if the record has no canonical identity.
    #[must_use]
    pub fn from_remote(record: &MonitorRecord) -> Option<Self> {
        Some(Self {
            identity: record.identity.canonical()?.clone(),
            version: record.version,
            fingerprint: record.fingerprint.clone(),
            synced_at: Utc::now(),
        })
    }
}

// ============================================================================
// MonitorRecord
// ============================================================================

/// Which store a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// One monitor as observed in one store
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRecord {
    pub identity: MonitorIdentity,
    /// Service version counter (`_version`); 0 for never-created monitors
    pub version: i64,
    pub body: MonitorBody,
    pub origin: Origin,
    pub fingerprint: Fingerprint,
    /// Directory holding the record (local records only)
    pub folder: Option<PathBuf>,
    /// Baseline from the last successful sync (local records only)
    pub sync_state: Option<SyncState>,
}

impl MonitorRecord {
    pub fn local(
        identity: MonitorIdentity,
        version: i64,
        body: MonitorBody,
        folder: impl Into<PathBuf>,
    ) -> Self {
        let fingerprint = body.fingerprint();
        Self {
            identity,
            version,
            body,
            origin: Origin::Local,
            fingerprint,
            folder: Some(folder.into()),
            sync_state: None,
        }
    }

    pub fn remote(id: RemoteId, version: i64, body: MonitorBody) -> Self {
        let fingerprint = body.fingerprint();
        Self {
            identity: MonitorIdentity::Canonical(id),
            version,
            body,
            origin: Origin::Remote,
            fingerprint,
            folder: None,
            sync_state: None,
        }
    }

    #[must_use]
    pub fn with_sync_state(mut self, state: Option<SyncState>) -> Self {
        self.sync_state = state;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.body.name
    }

    /// Last path component of the record's folder
    #[must_use]
    pub fn folder_name(&self) -> Option<&str> {
        self.folder
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
    }

    /// Replace the body and recompute the fingerprint
    pub fn set_body(&mut self, body: MonitorBody) {
        self.fingerprint = body.fingerprint();
        self.body = body;
    }

    /// Whether the local content differs from the last synced baseline
    ///
    /// `None` when no baseline is known.
    #[must_use]
    pub fn changed_since_sync(&self) -> Option<bool> {
        self.sync_state
            .as_ref()
            .map(|state| state.fingerprint != self.fingerprint)
    }

    /// Case-insensitive substring match on the monitor name
    #[must_use]
    pub fn matches_filter(&self, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(f) => self.name().to_lowercase().contains(&f.to_lowercase()),
        }
    }
}
