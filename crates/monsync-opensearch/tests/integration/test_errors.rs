//! Error classification of gateway failures

use monsync_core::domain::{MonitorBody, RemoteId};
use monsync_core::ports::{GatewayError, GatewayErrorKind, IRemoteGateway};
use monsync_opensearch::client::OpenSearchClient;
use monsync_opensearch::gateway::OpenSearchGateway;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::setup_gateway;

fn kind_of(err: &anyhow::Error) -> GatewayErrorKind {
    GatewayError::find(err).expect("gateway error in chain").kind
}

#[tokio::test]
async fn unauthorized_is_authorization_error() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/_search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = gateway.list_all().await.unwrap_err();
    assert_eq!(kind_of(&err), GatewayErrorKind::Authorization);
}

#[tokio::test]
async fn server_error_is_transient() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/R-1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let id = RemoteId::new("R-1".to_string()).unwrap();
    let err = gateway.get(&id).await.unwrap_err();
    assert_eq!(kind_of(&err), GatewayErrorKind::Transient);
}

#[tokio::test]
async fn rejected_create_carries_reason() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("POST"))
        .and(path("/_plugins/_alerting/monitors"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"type": "illegal_argument_exception", "reason": "Failed to parse monitor"},
            "status": 400
        })))
        .mount(&server)
        .await;

    let err = gateway.create(&MonitorBody::named("broken")).await.unwrap_err();
    assert_eq!(kind_of(&err), GatewayErrorKind::Rejected);
    assert!(format!("{err:#}").contains("Failed to parse monitor"));
}

#[tokio::test]
async fn garbage_response_is_invalid() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/_plugins/_alerting/monitors/R-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let id = RemoteId::new("R-1".to_string()).unwrap();
    let err = gateway.get(&id).await.unwrap_err();
    assert_eq!(kind_of(&err), GatewayErrorKind::InvalidResponse);
}

#[tokio::test]
async fn unreachable_host_is_transient() {
    // Nothing listens on port 9 (discard) on test machines
    let client = OpenSearchClient::with_base_url("http://127.0.0.1:9");
    let gateway = OpenSearchGateway::new(client, 100);

    let err = gateway.list_all().await.unwrap_err();
    assert_eq!(kind_of(&err), GatewayErrorKind::Transient);
}
