#![allow(clippy::unwrap_used)]
// Integration tests for `FortiClient` and `FortiosProvider` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fortios_core::capability::FirmwareVersion;
use fortios_core::provider::Provider;
use fortios_core::resource::{Resource, ResourceId, State};
use fortios_core::transport::Transport;
use fortios_core::{Value, WireObject};
use fortios_provider::{ClientConfig, FortiClient, FortiosProvider};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), "secret-token")
        .with_retries(0)
        .with_timeout(Duration::from_secs(5))
}

async fn setup() -> (MockServer, FortiClient) {
    let server = MockServer::start().await;
    let client = FortiClient::new(&config(&server)).unwrap();
    (server, client)
}

fn object(value: serde_json::Value) -> WireObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

// ── Read tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_sends_token_and_vdom() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/web"))
        .and(query_param("vdom", "customer"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "http_status": 200,
            "status": "success",
            "results": [{ "name": "web", "subnet": "10.0.0.0 255.255.255.0" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let obj = client
        .read("firewall/address", Some("web"), Some("customer"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(obj.get("name"), Some(&json!("web")));
}

#[tokio::test]
async fn test_read_uses_default_vdom() {
    let server = MockServer::start().await;
    let client = FortiClient::new(&config(&server).with_vdom("root")).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/system/global"))
        .and(query_param("vdom", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "results": { "hostname": "fw01" }
        })))
        .mount(&server)
        .await;

    let obj = client.read("system/global", None, None).await.unwrap().unwrap();
    assert_eq!(obj.get("hostname"), Some(&json!("fw01")));
}

#[tokio::test]
async fn test_read_encodes_mkey() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/net%2010.0.0.0%2F8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "results": [{ "name": "net 10.0.0.0/8" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let obj = client
        .read("firewall/address", Some("net 10.0.0.0/8"), None)
        .await
        .unwrap();
    assert!(obj.is_some());
}

#[tokio::test]
async fn test_read_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "http_status": 404,
            "status": "error"
        })))
        .mount(&server)
        .await;

    let obj = client.read("firewall/address", Some("gone"), None).await.unwrap();
    assert!(obj.is_none());
}

#[tokio::test]
async fn test_read_empty_results() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/policy/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "results": []
        })))
        .mount(&server)
        .await;

    let obj = client.read("firewall/policy", Some("7"), None).await.unwrap();
    assert!(obj.is_none());
}

// ── Write tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_returns_mkey() {
    let (server, client) = setup().await;

    let body = object(json!({ "srcintf": [{ "name": "port1" }], "action": "accept" }));

    Mock::given(method("POST"))
        .and(path("/api/v2/cmdb/firewall/policy"))
        .and(body_json(json!({ "srcintf": [{ "name": "port1" }], "action": "accept" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "mkey": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client.create("firewall/policy", &body, None).await.unwrap();
    assert_eq!(response.get("mkey"), Some(&json!(42)));
}

#[tokio::test]
async fn test_singleton_update_has_no_mkey() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v2/cmdb/system/global"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let body = object(json!({ "hostname": "fw01" }));
    let response = client.update("system/global", None, &body, None).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_delete_error_reports_cli_error() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/cmdb/firewall/address/web"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "http_status": 500,
            "status": "error",
            "error": -23,
            "cli_error": "entry is used by firewall policy 3\n"
        })))
        .mount(&server)
        .await;

    let err = client
        .delete("firewall/address", "web", None)
        .await
        .unwrap_err();

    assert_eq!(err.status, Some(500));
    assert_eq!(err.to_string(), "HTTP 500: entry is used by firewall policy 3");
}

#[tokio::test]
async fn test_error_status_in_successful_response() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/v2/cmdb/firewall/address/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "error": -5
        })))
        .mount(&server)
        .await;

    let body = object(json!({ "comment": "x" }));
    let err = client
        .update("firewall/address", Some("web"), &body, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP 200: error code -5");
}

// ── Connection tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_device_version() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/monitor/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "version": "v7.2.8",
            "build": 1639
        })))
        .mount(&server)
        .await;

    let version = client.device_version().await.unwrap();
    assert_eq!(version, Some(FirmwareVersion::new(7, 2, 8)));
}

#[tokio::test]
async fn test_connection_refused_is_retried_then_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::new(format!("http://127.0.0.1:{port}"), "secret-token")
        .with_retries(2)
        .with_retry_delay(Duration::from_millis(10));
    let client = FortiClient::new(&config).unwrap();

    let err = client
        .read("firewall/address", Some("web"), None)
        .await
        .unwrap_err();

    assert!(err.status.is_none());
    assert!(err.to_string().starts_with("HTTP transport error"), "{err}");
}

// ── Provider tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_provider_create_then_refresh() {
    let (server, client) = setup().await;
    let provider = FortiosProvider::new(client);

    Mock::given(method("POST"))
        .and(path("/api/v2/cmdb/firewall/address"))
        .and(body_json(json!({
            "name": "web",
            "subnet": "10.0.0.0 255.255.255.0",
            "comment": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "mkey": "web"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/firewall/address/web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "results": [{
                "name": "web",
                "uuid": "5e4c2f7a-0000-51ee-1111-000000000000",
                "type": "ipmask",
                "subnet": "10.0.0.0 255.255.255.0",
                "comment": "",
                "color": 0,
                "tagging": []
            }]
        })))
        .mount(&server)
        .await;

    let resource = Resource::new("firewall_address", "web")
        .with_attribute("name", Value::string("web"))
        .with_attribute("subnet", Value::string("10.0.0.0/24"))
        .with_attribute("comment", Value::string(""));

    let state = provider.create(&resource).await.unwrap();

    assert!(state.exists);
    assert_eq!(state.identifier.as_deref(), Some("web"));
    assert_eq!(state.attributes.get("subnet"), Some(&Value::string("10.0.0.0/24")));
    assert_eq!(
        state.attributes.get("uuid"),
        Some(&Value::string("5e4c2f7a-0000-51ee-1111-000000000000"))
    );
    // Device defaults the user never set stay out of state
    assert!(!state.attributes.contains_key("type"));
    assert!(!state.attributes.contains_key("comment"));
}

#[tokio::test]
async fn test_provider_read_missing_object() {
    let (server, client) = setup().await;
    let provider = FortiosProvider::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/system.snmp/community/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = ResourceId::new("system_snmp_community", "public");
    let prior = State::existing(id.clone(), Default::default()).with_identifier("3");
    let state = provider.read(&id, "3", &prior).await.unwrap();

    assert!(!state.exists);
}

#[tokio::test]
async fn test_provider_import_reads_every_field() {
    let (server, client) = setup().await;
    let provider = FortiosProvider::new(client);

    Mock::given(method("GET"))
        .and(path("/api/v2/cmdb/system.snmp/community/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "results": [{
                "id": 3,
                "name": "public",
                "status": "enable",
                "hosts": [
                    { "id": 2, "ip": "10.0.2.0 255.255.255.0", "host-type": "trap" },
                    { "id": 1, "ip": "10.0.1.1 255.255.255.255", "host-type": "any" }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let id = ResourceId::new("system_snmp_community", "public");
    let state = provider.import(&id, "3", None).await.unwrap();

    assert_eq!(state.attributes.get("id"), Some(&Value::Int(3)));
    assert_eq!(state.attributes.get("status"), Some(&Value::string("enable")));
    let hosts = state.attributes.get("hosts").unwrap().as_list().unwrap();
    let ids: Vec<_> = hosts
        .iter()
        .map(|h| h.as_block().unwrap().get("id").cloned())
        .collect();
    assert_eq!(ids, vec![Some(Value::Int(1)), Some(Value::Int(2))]);
    assert_eq!(
        hosts[0].as_block().unwrap().get("ip"),
        Some(&Value::string("10.0.1.1/32"))
    );
}

#[tokio::test]
async fn test_provider_error_names_operation() {
    let (server, client) = setup().await;
    let provider = FortiosProvider::new(client);

    Mock::given(method("DELETE"))
        .and(path("/api/v2/cmdb/firewall/addrgrp/web-group"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "cli_error": "entry is in use"
        })))
        .mount(&server)
        .await;

    let id = ResourceId::new("firewall_addrgrp", "web-group");
    let err = provider.delete(&id, "web-group", None).await.unwrap_err();

    assert!(
        err.message
            .starts_with("Error deleting firewall_addrgrp resource:"),
        "{}",
        err.message
    );
    assert!(err.message.contains("entry is in use"), "{}", err.message);
}

#[tokio::test]
async fn test_provider_rejects_unknown_type() {
    let (_server, client) = setup().await;
    let provider = FortiosProvider::new(client);

    let id = ResourceId::new("firewall_vip", "x");
    let err = provider.import(&id, "x", None).await.unwrap_err();
    assert!(err.message.contains("Unknown resource type"));
}
