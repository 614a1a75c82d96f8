//! Happy-path gateway operations against a mocked Alerting API

use monsync_core::domain::{MonitorBody, RemoteId};
use monsync_core::ports::IRemoteGateway;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{monitor_source, search_hit, search_response, setup_gateway};

#[tokio::test]
async fn list_all_parses_hits_and_pins_update_time() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/_search"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"version": true, "query": {"match_all": {}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(vec![
            search_hit("id-1", 3, "cpu-alert"),
            search_hit("id-2", 1, "disk-alert"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = gateway.list_all().await.unwrap();
    assert_eq!(records.len(), 2);

    let cpu = &records[0];
    assert_eq!(cpu.name(), "cpu-alert");
    assert_eq!(cpu.identity.as_str(), "id-1");
    assert_eq!(cpu.version, 3);
    assert_eq!(cpu.body.extra["last_update_time"], json!(0));
    assert_eq!(cpu.body.extra["enabled_time"], json!(1700000000000_i64));
    assert!(cpu.folder.is_none());
}

#[tokio::test]
async fn list_all_treats_missing_index_as_empty() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/_search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "index_not_found_exception", "reason": "no such index [.opendistro-alerting-config]"},
            "status": 404
        })))
        .mount(&server)
        .await;

    assert!(gateway.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_all_refuses_truncated_results() {
    let (server, gateway) = setup_gateway().await;

    let mut response = search_response(vec![search_hit("id-1", 1, "a")]);
    response["hits"]["total"]["value"] = json!(5);

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;

    let err = gateway.list_all().await.unwrap_err();
    assert!(format!("{err:#}").contains("search_size"));
}

#[tokio::test]
async fn get_returns_single_monitor() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/R-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "R-42",
            "_version": 7,
            "_seq_no": 10,
            "_primary_term": 1,
            "monitor": monitor_source("disk-alert")
        })))
        .mount(&server)
        .await;

    let id = RemoteId::new("R-42".to_string()).unwrap();
    let record = gateway.get(&id).await.unwrap();
    assert_eq!(record.name(), "disk-alert");
    assert_eq!(record.version, 7);
    assert_eq!(record.identity.canonical(), Some(&id));
}

#[tokio::test]
async fn create_posts_body_and_returns_id() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("POST"))
        .and(path("/_plugins/_alerting/monitors"))
        .and(body_partial_json(json!({"name": "cpu-alert", "monitor_type": "query_level_monitor"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "new-id",
            "_version": 1,
            "monitor": monitor_source("cpu-alert")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = MonitorBody::from_value(monitor_source("cpu-alert"))
        .unwrap()
        .prepare_for_create();
    let id = gateway.create(&body).await.unwrap();
    assert_eq!(id.as_str(), "new-id");
}

#[tokio::test]
async fn update_puts_body_to_monitor_path() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("PUT"))
        .and(path("/_plugins/_alerting/monitors/R-7"))
        .and(body_partial_json(json!({"name": "cpu-alert", "enabled": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "R-7",
            "_version": 2,
            "monitor": monitor_source("cpu-alert")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut body = MonitorBody::from_value(monitor_source("cpu-alert")).unwrap();
    body.enabled = Some(false);
    let id = RemoteId::new("R-7".to_string()).unwrap();
    gateway.update(&id, &body).await.unwrap();
}
