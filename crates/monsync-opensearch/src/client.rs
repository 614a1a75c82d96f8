//! Alerting API HTTP client
//!
//! Thin wrapper over `reqwest::Client` that adds basic authentication,
//! builds URLs from the instance base URL and maps non-success statuses to
//! [`OpenSearchError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use monsync_opensearch::client::{ClientOptions, OpenSearchClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = OpenSearchClient::new(
//!     "https://search.example.com:9200",
//!     ClientOptions { timeout: Duration::from_secs(30), accept_invalid_certs: false },
//! )?;
//! let monitor = client.get_json("/_plugins/_alerting/monitors/abc").await?;
//! println!("{monitor}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use monsync_core::ports::Credentials;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::OpenSearchError;

/// Transport settings for [`OpenSearchClient`]
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Upper bound for a whole request, connect included
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

/// HTTP client for one OpenSearch deployment
pub struct OpenSearchClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl OpenSearchClient {
    /// Creates an unauthenticated client for `base_url`
    ///
    /// # Errors
    /// Fails if the URL is not http(s) or the TLS backend cannot be set up
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, OpenSearchError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| OpenSearchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OpenSearchError::InvalidUrl(format!(
                "{base_url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Creates an unauthenticated client with default options (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Sets basic-auth credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request builder for `path` (relative to the base URL), authenticated
    /// when credentials are set
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }

    /// Sends a request and decodes the JSON response
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, OpenSearchError> {
        debug!(method = %method, path, "Alerting API request");

        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), path, "Alerting API error response");
            return Err(OpenSearchError::from_status(status, text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| OpenSearchError::InvalidResponse(format!("{path}: {e}")))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, OpenSearchError> {
        self.send_json(Method::GET, path, None).await
    }
}
