//! End-to-end decision scenarios

use std::sync::atomic::Ordering;
use std::sync::Arc;

use monsync_core::domain::SyncAction;
use monsync_core::ports::{ApproveAll, ApproveNone, ILocalStore};
use monsync_sync::engine::SyncOptions;
use monsync_sync::retry::RetryPolicy;
use monsync_sync::store::FsMonitorStore;
use serde_json::json;
use tempfile::TempDir;

use crate::common::*;

#[tokio::test]
async fn test_create_remote_promotes_temporary_identity() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu-alert", "", 0, monitor("cpu-alert", 5));
    let gateway = FakeGateway::new();
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.created_remote, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(gateway.ids(), vec!["R-100"]);
    let stored = read_local(dir.path(), "prod", "cpu-alert");
    assert_eq!(stored["_id"], json!("R-100"));
    assert!(dir.path().join("prod/cpu-alert/sync-state.json").exists());

    // Promoted for good: the next pass matches by identity
    let again = sync.sync_instance(&instance("prod")).await;
    assert_eq!(again.total_changes(), 0);
    assert_eq!(again.no_op, 1);
    assert_eq!(gateway.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_local_materializes_remote_monitor() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-42", monitor("disk-alert", 80));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.created_local, 1);
    assert_eq!(folders(dir.path(), "prod"), vec!["disk-alert"]);
    let stored = read_local(dir.path(), "prod", "disk-alert");
    assert_eq!(stored["_id"], json!("R-42"));
    assert_eq!(stored["_version"], json!(1));

    // Round trip: what was written loads back structurally equal
    let store = FsMonitorStore::new(dir.path());
    let snapshot = store.load_all(&instance("prod")).await.unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(Some(snapshot.records[0].body.clone()), gateway.body("R-42"));
}

#[tokio::test]
async fn test_identical_monitor_is_noop() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-7", monitor("mem", 90));
    write_local(dir.path(), "prod", "mem", "R-7", 1, monitor("mem", 90));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.no_op, 1);
    assert_eq!(report.total_changes(), 0);
    assert_eq!(gateway.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_differing_monitor_updates_remote_with_diff() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-7", monitor("mem", 90));
    write_local(dir.path(), "prod", "mem", "R-7", 1, monitor("mem", 95));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let plan = sync.plan(&instance("prod")).await.unwrap();
    assert_eq!(plan.decisions.len(), 1);
    let decision = &plan.decisions[0];
    assert_eq!(decision.action, SyncAction::UpdateRemote);
    let rendered = decision.changes.as_ref().unwrap().render();
    assert!(rendered.contains("condition.script.source"));
    assert!(rendered.contains("> 95"));

    let report = sync.sync_instance(&instance("prod")).await;
    assert_eq!(report.updated_remote, 1);
    let remote = gateway.body("R-7").unwrap();
    let expected = monsync_core::domain::MonitorBody::from_value(monitor("mem", 95)).unwrap();
    assert!(remote.same_content(&expected));
}

#[tokio::test]
async fn test_remote_edit_is_pulled_when_local_untouched() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("latency", 200));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );
    sync.sync_instance(&instance("prod")).await;

    gateway.edit("R-1", monitor("latency", 300));
    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.updated_local, 1);
    assert_eq!(report.updated_remote, 0);
    assert_eq!(gateway.updates.load(Ordering::SeqCst), 0);
    let stored = read_local(dir.path(), "prod", "latency");
    assert_eq!(stored["_version"], json!(2));
    let source = stored["monitor"]["triggers"][0]["query_level_trigger"]["condition"]["script"]["source"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(source.ends_with("> 300"));
}

#[tokio::test]
async fn test_hand_made_copy_binds_to_remote_identity() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-9", monitor("errors", 1));
    write_local(dir.path(), "prod", "errors", "", 0, monitor("errors", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.reconciled, 1);
    assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
    assert_eq!(read_local(dir.path(), "prod", "errors")["_id"], json!("R-9"));
}

#[tokio::test]
async fn test_renamed_monitor_moves_folder() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-3", monitor("heap usage", 75));
    write_local(dir.path(), "prod", "heap", "R-3", 1, monitor("heap usage", 75));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.reconciled, 1);
    assert_eq!(folders(dir.path(), "prod"), vec!["heap usage"]);
}

#[tokio::test]
async fn test_duplicate_folders_are_pruned_after_confirmation() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu", "", 0, monitor("cpu", 1));
    write_local(dir.path(), "prod", "cpu copy", "", 0, monitor("cpu", 2));
    let gateway = FakeGateway::new();
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.deduplicated, 1);
    assert_eq!(report.created_remote, 1);
    assert_eq!(folders(dir.path(), "prod"), vec!["cpu"]);
}

#[tokio::test]
async fn test_declined_decisions_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu", "", 0, monitor("cpu", 1));
    write_local(dir.path(), "prod", "cpu copy", "", 0, monitor("cpu", 2));
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("disk", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveNone),
        SyncOptions {
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.skipped, 3);
    assert_eq!(report.total_changes(), 0);
    assert_eq!(gateway.ids(), vec!["R-1"]);
    assert_eq!(folders(dir.path(), "prod"), vec!["cpu", "cpu copy"]);
}

#[tokio::test]
async fn test_dry_run_reports_without_applying() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu", "", 0, monitor("cpu", 1));
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("disk", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveNone),
        SyncOptions {
            dry_run: true,
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert!(report.dry_run);
    assert_eq!(report.created_remote, 1);
    assert_eq!(report.created_local, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(gateway.ids(), vec!["R-1"]);
    assert_eq!(folders(dir.path(), "prod"), vec!["cpu"]);
    assert_eq!(read_local(dir.path(), "prod", "cpu")["_id"], json!(""));
}

#[tokio::test]
async fn test_filter_limits_participating_monitors() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("CPU busy", 1));
    gateway.insert("R-2", monitor("disk full", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        SyncOptions {
            filter: Some("cpu".to_string()),
            ..options()
        },
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.created_local, 1);
    assert_eq!(folders(dir.path(), "prod"), vec!["CPU busy"]);
}

#[tokio::test]
async fn test_filter_keeps_locally_renamed_monitor_bound_to_remote() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("cpu", 1));
    gateway.insert("R-2", monitor("disk", 1));
    write_local(dir.path(), "prod", "cpu", "R-1", 1, monitor("cpu renamed", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        SyncOptions {
            filter: Some("renamed".to_string()),
            ..options()
        },
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.failed, 0);
    assert_eq!(report.created_remote, 0);
    assert_eq!(report.created_local, 0);
    assert_eq!(report.updated_remote, 1);
    assert_eq!(gateway.creates.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.ids(), vec!["R-1", "R-2"]);
    assert_eq!(gateway.body("R-1").unwrap().name, "cpu renamed");
    assert_eq!(folders(dir.path(), "prod"), vec!["cpu renamed"]);
    assert_eq!(read_local(dir.path(), "prod", "cpu renamed")["_id"], json!("R-1"));
}

#[tokio::test]
async fn test_confirmation_answered_off_the_runtime_thread() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("cpu", 1));
    gateway.insert("R-2", monitor("disk", 2));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(BlockingFirstOnly),
        SyncOptions {
            retry: RetryPolicy::none(),
            ..Default::default()
        },
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.created_local, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(folders(dir.path(), "prod"), vec!["cpu"]);
}
