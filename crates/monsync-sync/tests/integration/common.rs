//! Shared fixtures: an in-memory alerting service and a temp monitor tree

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use monsync_core::config::InstanceConfig;
use monsync_core::domain::{MonitorBody, MonitorRecord, RemoteId};
use monsync_core::ports::{
    GatewayError, GatewayErrorKind, IConfirmation, IGatewayProvider, IRemoteGateway,
};
use monsync_sync::engine::{SyncOptions, SyncOrchestrator};
use monsync_sync::retry::RetryPolicy;
use monsync_sync::store::FsMonitorStore;
use serde_json::{json, Value};

/// In-memory stand-in for one instance's monitor API
#[derive(Default)]
pub struct FakeGateway {
    monitors: Mutex<BTreeMap<String, (i64, MonitorBody)>>,
    next_id: AtomicU32,
    pub creates: AtomicU32,
    pub updates: AtomicU32,
    /// Calls to `create`/`update`, failed ones included
    pub create_attempts: AtomicU32,
    pub update_attempts: AtomicU32,
    failure: Mutex<Option<GatewayErrorKind>>,
    write_failure: Mutex<Option<GatewayErrorKind>>,
    rejected_name: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU32::new(100),
            ..Default::default()
        })
    }

    pub fn insert(&self, id: &str, body: Value) {
        let body = MonitorBody::from_value(body).unwrap();
        self.monitors.lock().unwrap().insert(id.to_string(), (1, body));
    }

    /// Simulates an edit made in the service UI
    pub fn edit(&self, id: &str, body: Value) {
        let body = MonitorBody::from_value(body).unwrap();
        let mut monitors = self.monitors.lock().unwrap();
        let entry = monitors.get_mut(id).unwrap();
        entry.0 += 1;
        entry.1 = body;
    }

    pub fn body(&self, id: &str) -> Option<MonitorBody> {
        self.monitors.lock().unwrap().get(id).map(|(_, b)| b.clone())
    }

    pub fn ids(&self) -> Vec<String> {
        self.monitors.lock().unwrap().keys().cloned().collect()
    }

    /// Every call fails with `kind` from now on
    pub fn fail_with(&self, kind: GatewayErrorKind) {
        *self.failure.lock().unwrap() = Some(kind);
    }

    /// `create` and `update` fail with `kind` from now on; reads still work
    pub fn fail_writes_with(&self, kind: GatewayErrorKind) {
        *self.write_failure.lock().unwrap() = Some(kind);
    }

    /// Creating a monitor with this name is refused
    pub fn reject_name(&self, name: &str) {
        *self.rejected_name.lock().unwrap() = Some(name.to_string());
    }

    fn check(&self) -> anyhow::Result<()> {
        match *self.failure.lock().unwrap() {
            Some(kind) => Err(GatewayError::new(kind, "injected failure").into()),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> anyhow::Result<()> {
        self.check()?;
        match *self.write_failure.lock().unwrap() {
            Some(kind) => Err(GatewayError::new(kind, "injected write failure").into()),
            None => Ok(()),
        }
    }

    fn record(id: &str, version: i64, body: &MonitorBody) -> MonitorRecord {
        MonitorRecord::remote(RemoteId::new(id.to_string()).unwrap(), version, body.clone())
    }
}

#[async_trait]
impl IRemoteGateway for FakeGateway {
    async fn list_all(&self) -> anyhow::Result<Vec<MonitorRecord>> {
        self.check()?;
        Ok(self
            .monitors
            .lock()
            .unwrap()
            .iter()
            .map(|(id, (version, body))| Self::record(id, *version, body))
            .collect())
    }

    async fn get(&self, id: &RemoteId) -> anyhow::Result<MonitorRecord> {
        self.check()?;
        let monitors = self.monitors.lock().unwrap();
        match monitors.get(id.as_str()) {
            Some((version, body)) => Ok(Self::record(id.as_str(), *version, body)),
            None => Err(GatewayError::new(GatewayErrorKind::NotFound, id.as_str()).into()),
        }
    }

    async fn create(&self, body: &MonitorBody) -> anyhow::Result<RemoteId> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        if self.rejected_name.lock().unwrap().as_deref() == Some(body.name.as_str()) {
            return Err(GatewayError::new(GatewayErrorKind::Rejected, "HTTP 400: bad trigger").into());
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = format!("R-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.monitors
            .lock()
            .unwrap()
            .insert(id.clone(), (1, body.clone()));
        Ok(RemoteId::new(id).unwrap())
    }

    async fn update(&self, id: &RemoteId, body: &MonitorBody) -> anyhow::Result<()> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let mut monitors = self.monitors.lock().unwrap();
        let entry = monitors
            .get_mut(id.as_str())
            .ok_or_else(|| GatewayError::new(GatewayErrorKind::NotFound, id.as_str()))?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        entry.0 += 1;
        entry.1 = body.clone();
        Ok(())
    }
}

/// Hands out one fake gateway per instance name
#[derive(Default)]
pub struct FakeProvider {
    gateways: HashMap<String, Arc<FakeGateway>>,
}

impl FakeProvider {
    pub fn with(mut self, instance: &str, gateway: Arc<FakeGateway>) -> Self {
        self.gateways.insert(instance.to_string(), gateway);
        self
    }
}

impl IGatewayProvider for FakeProvider {
    fn connect(&self, instance: &InstanceConfig) -> anyhow::Result<Arc<dyn IRemoteGateway>> {
        match self.gateways.get(&instance.name) {
            Some(gateway) => Ok(gateway.clone() as Arc<dyn IRemoteGateway>),
            None => anyhow::bail!("no gateway for {}", instance.name),
        }
    }
}

/// Approves the first decision only, answering from a blocking thread the
/// way a terminal prompt does
pub struct BlockingFirstOnly;

#[async_trait]
impl IConfirmation for BlockingFirstOnly {
    async fn confirm(
        &self,
        _instance: &str,
        decisions: &[monsync_core::domain::SyncDecision],
    ) -> anyhow::Result<Vec<usize>> {
        let count = decisions.len();
        let approved: Vec<usize> =
            tokio::task::spawn_blocking(move || (0..count.min(1)).collect()).await?;
        Ok(approved)
    }
}

pub fn instance(name: &str) -> InstanceConfig {
    InstanceConfig::new(name, "http://localhost:9200")
}

pub fn options() -> SyncOptions {
    SyncOptions {
        force: true,
        retry: RetryPolicy::none(),
        ..Default::default()
    }
}

pub fn orchestrator(
    root: &Path,
    provider: FakeProvider,
    confirmation: Arc<dyn IConfirmation>,
    options: SyncOptions,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        Arc::new(FsMonitorStore::new(root)),
        Arc::new(provider),
        confirmation,
        options,
    )
}

pub fn monitor(name: &str, threshold: i64) -> Value {
    json!({
        "type": "monitor",
        "monitor_type": "query_level_monitor",
        "name": name,
        "enabled": true,
        "schedule": {"period": {"interval": 1, "unit": "MINUTES"}},
        "inputs": [{"search": {"indices": ["logs-*"], "query": {"size": 0}}}],
        "triggers": [{
            "query_level_trigger": {
                "name": "too many",
                "severity": "1",
                "condition": {"script": {"source": format!("ctx.results[0].hits.total.value > {threshold}")}},
                "actions": []
            }
        }]
    })
}

/// Writes `<root>/<instance>/<folder>/monitor.json`
pub fn write_local(root: &Path, instance: &str, folder: &str, id: &str, version: i64, body: Value) {
    let dir = root.join(instance).join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    let doc = json!({"_id": id, "_version": version, "monitor": body});
    std::fs::write(dir.join("monitor.json"), serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

pub fn read_local(root: &Path, instance: &str, folder: &str) -> Value {
    let raw = std::fs::read(root.join(instance).join(folder).join("monitor.json")).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

pub fn folders(root: &Path, instance: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join(instance))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
