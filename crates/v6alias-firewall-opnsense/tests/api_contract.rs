// Integration tests for `OpnsenseClient` using wiremock.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use v6alias_core::Error;
use v6alias_core::traits::AliasClient;
use v6alias_firewall_opnsense::OpnsenseClient;

const UUID: &str = "7f3c2a1e-0b44-4c36-9d1a-2f6e8b5c9a10";

// "key:secret"
const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(dry_run: bool) -> (MockServer, OpnsenseClient) {
    let server = MockServer::start().await;
    let client = OpnsenseClient::new(
        server.uri(),
        "key",
        "secret",
        true,
        Duration::from_secs(5),
        dry_run,
    )
    .unwrap();
    (server, client)
}

fn entries(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check_sends_basic_auth() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/core/firmware/status"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "none"})))
        .expect(1)
        .mount(&server)
        .await;

    client.health_check().await.unwrap();
}

#[tokio::test]
async fn test_resolve_alias_id() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias/getAliasUUID/WAN_V6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": UUID})))
        .mount(&server)
        .await;

    assert_eq!(client.resolve_alias_id("WAN_V6").await.unwrap(), UUID);
}

#[tokio::test]
async fn test_list_alias_entries_in_listed_order() {
    let (server, client) = setup(false).await;

    let body = json!({
        "total": 3,
        "rowCount": 3,
        "current": 1,
        "rows": [
            { "ip": "192.0.2.5/32" },
            { "ip": "2003:e1:aaaa:bbbb::/64" },
            { "ip": "fd00:10::/64" },
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias_util/list/WAN_V6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let listed = client.list_alias_entries("WAN_V6").await.unwrap();
    assert_eq!(
        listed,
        entries(&["192.0.2.5/32", "2003:e1:aaaa:bbbb::/64", "fd00:10::/64"])
    );
}

#[tokio::test]
async fn test_list_empty_alias() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias_util/list/WAN_V6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    assert!(client.list_alias_entries("WAN_V6").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_replace_sends_full_alias_body() {
    let (server, client) = setup(false).await;

    let expected = json!({
        "alias": {
            "enabled": "1",
            "name": "WAN_V6",
            "type": "network",
            "content": "192.0.2.5/32\n2a01:4f8:1234:5678::/64",
        }
    });

    Mock::given(method("POST"))
        .and(path(format!("/api/firewall/alias/setItem/{}", UUID)))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "saved"})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .replace_alias_entries(
            UUID,
            "WAN_V6",
            &entries(&["192.0.2.5/32", "2a01:4f8:1234:5678::/64"]),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_commit_reconfigures() {
    let (server, client) = setup(false).await;

    Mock::given(method("POST"))
        .and(path("/api/firewall/alias/reconfigure"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    client.commit().await.unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_unknown_alias() {
    let (server, client) = setup(false).await;

    // OPNsense answers an empty list for an unknown alias name
    Mock::given(method("GET"))
        .and(path("/api/firewall/alias/getAliasUUID/MISSING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = client.resolve_alias_id("MISSING").await;
    match result {
        Err(Error::Remote { operation, message }) => {
            assert_eq!(operation, "resolve_alias_id");
            assert!(message.contains("alias not found"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_replace_rejected_by_validation() {
    let (server, client) = setup(false).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/firewall/alias/setItem/{}", UUID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "failed",
            "validations": { "alias.content": "Entry \"nonsense\" is not a valid hostname, IP address or range." }
        })))
        .mount(&server)
        .await;

    let result = client
        .replace_alias_entries(UUID, "WAN_V6", &entries(&["nonsense"]))
        .await;
    match result {
        Err(Error::Remote { message, .. }) => assert!(message.contains("not a valid")),
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_commit_bad_status() {
    let (server, client) = setup(false).await;

    Mock::given(method("POST"))
        .and(path("/api/firewall/alias/reconfigure"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "failed"})))
        .mount(&server)
        .await;

    assert!(matches!(client.commit().await, Err(Error::Remote { .. })));
}

#[tokio::test]
async fn test_unauthorized_maps_to_remote_error() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/core/firmware/status"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    match client.health_check().await {
        Err(Error::Remote { operation, message }) => {
            assert_eq!(operation, "health_check");
            assert!(message.contains("Authentication failed"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_maps_to_remote_error() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias_util/list/WAN_V6"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend crashed"))
        .mount(&server)
        .await;

    match client.list_alias_entries("WAN_V6").await {
        Err(Error::Remote { message, .. }) => {
            assert!(message.contains("server error"));
            assert!(message.contains("backend crashed"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_rows_rejected() {
    let (server, client) = setup(false).await;

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias_util/list/WAN_V6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": "nope"})))
        .mount(&server)
        .await;

    assert!(matches!(
        client.list_alias_entries("WAN_V6").await,
        Err(Error::Remote { .. })
    ));
}

#[tokio::test]
async fn test_timeout_is_remote_error() {
    let server = MockServer::start().await;
    let client = OpnsenseClient::new(
        server.uri(),
        "key",
        "secret",
        true,
        Duration::from_millis(100),
        false,
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/core/firmware/status"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    assert!(matches!(client.health_check().await, Err(Error::Remote { .. })));
}

// ── Dry-run ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dry_run_reads_but_never_posts() {
    let (server, client) = setup(true).await;

    Mock::given(method("GET"))
        .and(path("/api/firewall/alias_util/list/WAN_V6"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"rows": [{ "ip": "2003:e1:aaaa:bbbb::/64" }]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "saved"})))
        .expect(0)
        .mount(&server)
        .await;

    let listed = client.list_alias_entries("WAN_V6").await.unwrap();
    assert_eq!(listed, entries(&["2003:e1:aaaa:bbbb::/64"]));

    client
        .replace_alias_entries(UUID, "WAN_V6", &entries(&["2a01:4f8:1234:5678::/64"]))
        .await
        .unwrap();
    client.commit().await.unwrap();
}
