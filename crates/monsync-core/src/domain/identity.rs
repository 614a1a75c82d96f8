//! Monitor identities
//!
//! A monitor is known either by the identifier the alerting service assigned
//! to it ([`RemoteId`]) or, before its first successful creation, by a
//! placeholder generated locally at load time ([`TempId`]).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Identifier assigned by the remote alerting service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace or path separators
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        // Used verbatim in request paths
        if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// Placeholder identity for a monitor that does not exist remotely yet
///
/// Temporary IDs live only in memory; they are never written to disk, so a
/// hand-made monitor gets a fresh one on every load until it is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(String);

impl TempId {
    const PREFIX: &'static str = "tmp-";

    /// Generate a fresh placeholder
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    /// Wrap an existing placeholder value
    ///
    /// # Errors
    /// Returns error if the value is empty
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidTempId(
                "Temporary ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TempId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a monitor record on either side of a sync
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonitorIdentity {
    /// Stable, service-assigned identity
    Canonical(RemoteId),
    /// Local placeholder, valid until the first successful remote create
    Temporary(TempId),
}

impl MonitorIdentity {
    /// Parse the `_id` field of a stored document; empty means "not created yet"
    pub fn from_stored(id: Option<&str>) -> Result<Self, DomainError> {
        match id.map(str::trim) {
            None | Some("") => Ok(Self::Temporary(TempId::generate())),
            Some(id) => Ok(Self::Canonical(RemoteId::new(id.to_string())?)),
        }
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// The canonical ID, if one has been assigned
    #[must_use]
    pub fn canonical(&self) -> Option<&RemoteId> {
        match self {
            Self::Canonical(id) => Some(id),
            Self::Temporary(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(id) => id.as_str(),
            Self::Temporary(id) => id.as_str(),
        }
    }
}

impl Display for MonitorIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical(id) => write!(f, "{id}"),
            Self::Temporary(id) => write!(f, "{id} (temporary)"),
        }
    }
}

impl From<RemoteId> for MonitorIdentity {
    fn from(id: RemoteId) -> Self {
        Self::Canonical(id)
    }
}
