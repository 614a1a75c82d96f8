//! Remote gateway over the Alerting monitor API
//!
//! Endpoints used:
//! - `GET  /_plugins/_alerting/monitors/_search` (list, one page)
//! - `GET  /_plugins/_alerting/monitors/{id}`
//! - `POST /_plugins/_alerting/monitors`
//! - `PUT  /_plugins/_alerting/monitors/{id}`

use anyhow::Context;
use async_trait::async_trait;
use monsync_core::domain::{MonitorBody, MonitorRecord, RemoteId};
use monsync_core::ports::{GatewayError, GatewayErrorKind, IRemoteGateway};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::OpenSearchClient;
use crate::OpenSearchError;

pub const MONITORS_PATH: &str = "/_plugins/_alerting/monitors";

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    total: Option<Value>,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version", default)]
    version: i64,
    #[serde(rename = "_source")]
    source: Value,
}

/// Shape of get/create responses
#[derive(Debug, Deserialize)]
struct MonitorResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version", default)]
    version: i64,
    #[serde(default)]
    monitor: Option<Value>,
}

// ============================================================================
// OpenSearchGateway
// ============================================================================

/// [`IRemoteGateway`] backed by the OpenSearch Alerting plugin
pub struct OpenSearchGateway {
    client: OpenSearchClient,
    search_size: u32,
}

impl OpenSearchGateway {
    pub fn new(client: OpenSearchClient, search_size: u32) -> Self {
        Self {
            client,
            search_size,
        }
    }

    fn to_record(id: String, version: i64, source: Value) -> anyhow::Result<MonitorRecord> {
        let id = RemoteId::new(id).map_err(|e| invalid(e.to_string()))?;
        let mut body = MonitorBody::from_value(source)
            .map_err(|e| invalid(format!("monitor {id}: {e}")))?;
        normalize(&mut body);
        Ok(MonitorRecord::remote(id, version, body))
    }
}

/// `last_update_time` moves on every server-side touch; pin it so stored
/// copies do not churn
fn normalize(body: &mut MonitorBody) {
    if let Some(value) = body.extra.get_mut("last_update_time") {
        *value = json!(0);
    }
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    GatewayError::new(GatewayErrorKind::InvalidResponse, message).into()
}

fn gateway_err(err: OpenSearchError) -> anyhow::Error {
    GatewayError::from(err).into()
}

fn total_hits(total: Option<&Value>) -> Option<u64> {
    match total? {
        Value::Number(n) => n.as_u64(),
        Value::Object(o) => o.get("value").and_then(Value::as_u64),
        _ => None,
    }
}

#[async_trait]
impl IRemoteGateway for OpenSearchGateway {
    #[tracing::instrument(skip(self), fields(url = %self.client.base_url()))]
    async fn list_all(&self) -> anyhow::Result<Vec<MonitorRecord>> {
        let query = json!({
            "size": self.search_size,
            "version": true,
            "query": {"match_all": {}}
        });
        let path = format!("{MONITORS_PATH}/_search");

        let value = match self.client.send_json(Method::GET, &path, Some(&query)).await {
            Ok(value) => value,
            // The alerting config index only exists once a monitor was created
            Err(OpenSearchError::NotFound(reason)) => {
                info!(%reason, "No alerting index yet, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(gateway_err(e)).context("Failed to list monitors"),
        };

        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| invalid(format!("monitor search: {e}")))?;

        let returned = response.hits.hits.len() as u64;
        if let Some(total) = total_hits(response.hits.total.as_ref()) {
            if total > returned {
                return Err(invalid(format!(
                    "instance holds {total} monitors but only {returned} were returned; raise remote.search_size"
                )));
            }
        }

        let mut records = Vec::with_capacity(response.hits.hits.len());
        for hit in response.hits.hits {
            records.push(Self::to_record(hit.id, hit.version, hit.source)?);
        }
        debug!(count = records.len(), "Listed remote monitors");
        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(url = %self.client.base_url()))]
    async fn get(&self, id: &RemoteId) -> anyhow::Result<MonitorRecord> {
        let value = self
            .client
            .get_json(&format!("{MONITORS_PATH}/{id}"))
            .await
            .map_err(gateway_err)
            .with_context(|| format!("Failed to fetch monitor {id}"))?;

        let response: MonitorResponse = serde_json::from_value(value)
            .map_err(|e| invalid(format!("monitor {id}: {e}")))?;
        let source = response
            .monitor
            .ok_or_else(|| invalid(format!("monitor {id}: response has no monitor")))?;
        Self::to_record(response.id, response.version, source)
    }

    #[tracing::instrument(skip(self, body), fields(url = %self.client.base_url(), name = %body.name))]
    async fn create(&self, body: &MonitorBody) -> anyhow::Result<RemoteId> {
        let payload = body.to_value();
        let value = self
            .client
            .send_json(Method::POST, MONITORS_PATH, Some(&payload))
            .await
            .map_err(gateway_err)
            .with_context(|| format!("Failed to create monitor '{}'", body.name))?;

        let response: MonitorResponse = serde_json::from_value(value)
            .map_err(|e| invalid(format!("create response: {e}")))?;
        let id = RemoteId::new(response.id).map_err(|e| invalid(e.to_string()))?;
        info!(id = %id, version = response.version, "Created monitor");
        Ok(id)
    }

    #[tracing::instrument(skip(self, body), fields(url = %self.client.base_url(), name = %body.name))]
    async fn update(&self, id: &RemoteId, body: &MonitorBody) -> anyhow::Result<()> {
        let payload = body.to_value();
        let value = self
            .client
            .send_json(Method::PUT, &format!("{MONITORS_PATH}/{id}"), Some(&payload))
            .await
            .map_err(gateway_err)
            .with_context(|| format!("Failed to update monitor {id}"))?;

        match value.get("_id").and_then(Value::as_str) {
            Some(returned) if returned != id.as_str() => {
                warn!(id = %id, returned, "Update answered with a different id");
            }
            _ => {}
        }
        info!(id = %id, "Updated monitor");
        Ok(())
    }
}
