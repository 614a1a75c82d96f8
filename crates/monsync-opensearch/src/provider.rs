//! Gateway provider for configured instances
//!
//! Builds one [`OpenSearchGateway`] per instance from the shared remote
//! settings. Credentials come from a resolver supplied by the caller, so
//! this crate never reads environment variables or secret stores.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use monsync_core::config::{InstanceConfig, RemoteConfig};
use monsync_core::ports::{Credentials, IGatewayProvider, IRemoteGateway};
use tracing::debug;

use crate::client::{ClientOptions, OpenSearchClient};
use crate::gateway::OpenSearchGateway;

/// Resolves the credentials of an instance; `None` means anonymous access
pub type CredentialResolver =
    Arc<dyn Fn(&InstanceConfig) -> anyhow::Result<Option<Credentials>> + Send + Sync>;

/// [`IGatewayProvider`] for OpenSearch instances
pub struct OpenSearchProvider {
    options: ClientOptions,
    search_size: u32,
    resolve_credentials: CredentialResolver,
}

impl OpenSearchProvider {
    pub fn new(remote: &RemoteConfig, resolve_credentials: CredentialResolver) -> Self {
        Self {
            options: ClientOptions {
                timeout: Duration::from_secs(remote.request_timeout_secs),
                accept_invalid_certs: remote.accept_invalid_certs,
            },
            search_size: remote.search_size,
            resolve_credentials,
        }
    }

    /// Provider that connects without credentials
    pub fn anonymous(remote: &RemoteConfig) -> Self {
        Self::new(remote, Arc::new(no_credentials))
    }
}

fn no_credentials(_: &InstanceConfig) -> anyhow::Result<Option<Credentials>> {
    Ok(None)
}

impl IGatewayProvider for OpenSearchProvider {
    fn connect(&self, instance: &InstanceConfig) -> anyhow::Result<Arc<dyn IRemoteGateway>> {
        let credentials = (self.resolve_credentials)(instance)
            .with_context(|| format!("Failed to resolve credentials for '{}'", instance.name))?;
        debug!(
            instance = %instance.name,
            url = %instance.url,
            authenticated = credentials.is_some(),
            "Connecting to instance"
        );
        let mut client = OpenSearchClient::new(&instance.url, self.options)
            .with_context(|| format!("Failed to create client for '{}'", instance.name))?;
        if let Some(credentials) = credentials {
            client = client.with_credentials(credentials);
        }
        Ok(Arc::new(OpenSearchGateway::new(client, self.search_size)))
    }
}
