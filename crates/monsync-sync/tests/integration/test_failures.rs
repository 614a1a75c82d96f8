//! Failure isolation: per monitor versus per instance

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use monsync_core::domain::FailureKind;
use monsync_core::ports::{ApproveAll, GatewayErrorKind};
use monsync_sync::engine::SyncOptions;
use monsync_sync::retry::RetryPolicy;
use serde_json::json;
use tempfile::TempDir;

use crate::common::*;

#[tokio::test]
async fn test_authorization_failure_is_fatal_only_for_its_instance() {
    let dir = TempDir::new().unwrap();
    let locked = FakeGateway::new();
    locked.fail_with(GatewayErrorKind::Authorization);
    let open = FakeGateway::new();
    open.insert("R-1", monitor("cpu", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default()
            .with("locked", locked)
            .with("open", open.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let instances = [instance("locked"), instance("open")];
    let run = sync.run(instances.iter()).await;

    assert!(run.has_fatal());
    assert!(run.instances[0].is_fatal());
    assert!(run.instances[0].fatal.as_deref().unwrap().contains("authorization"));
    assert!(!run.instances[1].is_fatal());
    assert_eq!(run.instances[1].created_local, 1);
}

#[tokio::test]
async fn test_unreachable_instance_is_fatal() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.fail_with(GatewayErrorKind::Transient);
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert!(report.is_fatal());
    assert!(report.fatal.as_deref().unwrap().contains("transient"));
}

#[tokio::test]
async fn test_missing_gateway_is_fatal() {
    let dir = TempDir::new().unwrap();
    let sync = orchestrator(dir.path(), FakeProvider::default(), Arc::new(ApproveAll), options());

    let report = sync.sync_instance(&instance("ghost")).await;

    assert!(report.is_fatal());
}

#[tokio::test]
async fn test_duplicate_remote_names_abort_the_instance() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("cpu", 1));
    gateway.insert("R-2", monitor("cpu", 2));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert!(report.is_fatal());
    assert_eq!(report.total_changes(), 0);
    assert!(!dir.path().join("prod").exists());
}

#[tokio::test]
async fn test_rejected_create_does_not_block_other_monitors() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "bad", "", 0, monitor("bad", 1));
    write_local(dir.path(), "prod", "good", "", 0, monitor("good", 1));
    let gateway = FakeGateway::new();
    gateway.reject_name("bad");
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert!(!report.is_fatal());
    assert_eq!(report.created_remote, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].monitor, "bad");
    assert_eq!(report.failures[0].kind, FailureKind::Remote);
    assert!(report.failures[0].reason.contains("bad trigger"));
    assert_eq!(read_local(dir.path(), "prod", "bad")["_id"], json!(""));
    assert_eq!(gateway.ids().len(), 1);
}

#[tokio::test]
async fn test_identity_conflict_is_reported_not_resolved() {
    let dir = TempDir::new().unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("alpha", 1));
    write_local(dir.path(), "prod", "alpha", "R-1", 1, monitor("alpha", 1));
    write_local(dir.path(), "prod", "beta", "R-1", 1, monitor("beta", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert!(!report.is_fatal());
    assert_eq!(report.no_op, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::IdentityConflict);
    assert_eq!(report.failures[0].identity.as_deref(), Some("R-1"));
    assert_eq!(folders(dir.path(), "prod"), vec!["alpha", "beta"]);
    assert_eq!(gateway.ids(), vec!["R-1"]);
}

#[tokio::test]
async fn test_unreadable_folder_is_reported_and_left_alone() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("prod/disk");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join("monitor.json"), "{ half written").unwrap();
    let gateway = FakeGateway::new();
    gateway.insert("R-5", monitor("disk", 1));
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway),
        Arc::new(ApproveAll),
        options(),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::Validation);
    assert_eq!(report.created_local, 0);
    assert_eq!(folders(dir.path(), "prod"), vec!["disk"]);
    let raw = std::fs::read_to_string(folder.join("monitor.json")).unwrap();
    assert_eq!(raw, "{ half written");
}

fn retrying(max_retries: u32) -> SyncOptions {
    SyncOptions {
        retry: RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(1)),
        ..options()
    }
}

#[tokio::test]
async fn test_transient_create_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu", "", 0, monitor("cpu", 1));
    let gateway = FakeGateway::new();
    gateway.fail_writes_with(GatewayErrorKind::Transient);
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        retrying(3),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(gateway.create_attempts.load(Ordering::SeqCst), 1);
    assert_eq!(report.created_remote, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, FailureKind::TransientNetwork);
    assert!(gateway.ids().is_empty());
    assert_eq!(read_local(dir.path(), "prod", "cpu")["_id"], json!(""));
}

#[tokio::test]
async fn test_transient_update_failure_is_retried() {
    let dir = TempDir::new().unwrap();
    write_local(dir.path(), "prod", "cpu", "R-1", 1, monitor("cpu", 2));
    let gateway = FakeGateway::new();
    gateway.insert("R-1", monitor("cpu", 1));
    gateway.fail_writes_with(GatewayErrorKind::Transient);
    let sync = orchestrator(
        dir.path(),
        FakeProvider::default().with("prod", gateway.clone()),
        Arc::new(ApproveAll),
        retrying(3),
    );

    let report = sync.sync_instance(&instance("prod")).await;

    assert_eq!(gateway.update_attempts.load(Ordering::SeqCst), 3 + 1);
    assert_eq!(gateway.updates.load(Ordering::SeqCst), 0);
    assert_eq!(report.updated_remote, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(gateway.body("R-1").unwrap().to_value(), monitor("cpu", 1));
}
