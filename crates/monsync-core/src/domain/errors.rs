//! Domain error types

use thiserror::Error;

/// Errors raised while constructing or validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Remote (service-assigned) identifier is malformed
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Temporary placeholder identifier is malformed
    #[error("Invalid temporary ID: {0}")]
    InvalidTempId(String),

    /// Monitor document does not have the expected shape
    #[error("Invalid monitor document: {0}")]
    InvalidMonitor(String),

    /// Monitor or instance name cannot be used
    #[error("Invalid name: {0}")]
    InvalidName(String),
}
