//! monsync OpenSearch - Alerting API gateway
//!
//! Provides async access to the monitor endpoints of the OpenSearch
//! Alerting plugin:
//! - Listing every monitor of an instance through the monitor search API
//! - Fetching, creating and updating single monitors
//! - HTTP basic authentication and bounded request timeouts
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with status-to-error mapping
//! - [`gateway`] - [`IRemoteGateway`](monsync_core::ports::IRemoteGateway) implementation
//! - [`provider`] - opens gateways for configured instances

pub mod client;
pub mod gateway;
pub mod provider;

use monsync_core::ports::{GatewayError, GatewayErrorKind};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the Alerting API
#[derive(Debug, Error)]
pub enum OpenSearchError {
    /// Credentials missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated user lacks alerting permissions
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested monitor does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Too many requests
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// The request was refused (other 4xx), typically a monitor body the
    /// plugin does not accept
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The instance URL cannot be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OpenSearchError {
    /// Map a non-success status and its body to an error
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let message = summarize_body(&body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests(message),
            s if s.is_server_error() => Self::ServerError {
                status: s.as_u16(),
                message,
            },
            s => Self::Rejected {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Coarse classification shared with the sync engine
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Unauthorized(_) | Self::Forbidden(_) => GatewayErrorKind::Authorization,
            Self::NotFound(_) => GatewayErrorKind::NotFound,
            Self::TooManyRequests(_) | Self::ServerError { .. } => GatewayErrorKind::Transient,
            Self::NetworkError(e) if e.is_decode() => GatewayErrorKind::InvalidResponse,
            Self::NetworkError(_) => GatewayErrorKind::Transient,
            Self::Rejected { .. } | Self::InvalidUrl(_) => GatewayErrorKind::Rejected,
            Self::InvalidResponse(_) => GatewayErrorKind::InvalidResponse,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == GatewayErrorKind::Transient
    }
}

impl From<OpenSearchError> for GatewayError {
    fn from(err: OpenSearchError) -> Self {
        GatewayError::new(err.kind(), err.to_string())
    }
}

/// OpenSearch error bodies look like `{"error": {"reason": "..."}, "status": 400}`
fn summarize_body(body: &str) -> String {
    let reason = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("reason")
                .and_then(|r| r.as_str())
                .or_else(|| error.as_str())
                .map(str::to_string)
        });
    match reason {
        Some(reason) => reason,
        None => body.chars().take(300).collect(),
    }
}
