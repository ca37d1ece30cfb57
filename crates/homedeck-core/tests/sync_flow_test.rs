//! Integration tests for the cache/sync flow against a mock hub.
#![allow(clippy::unwrap_used)]

use chrono::Utc;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use homedeck_api::{HubClient, TransportConfig};
use homedeck_core::{
    CacheManager, Companion, CoreError, EntityStore, Refreshed, SyncOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn hub_client(server: &MockServer) -> HubClient {
    HubClient::new(
        Url::parse(&server.uri()).unwrap(),
        SecretString::from("test-token"),
        &TransportConfig::default(),
    )
    .unwrap()
}

fn manager_for(server: &MockServer) -> CacheManager {
    CacheManager::new(
        EntityStore::open_in_memory().unwrap(),
        Some(hub_client(server)),
    )
}

async fn setup() -> (MockServer, CacheManager) {
    // A non-pooled server: dropping it closes the listener, which the
    // unreachable-hub test relies on (pooled servers keep the port open).
    let server = MockServer::builder().start().await;
    let manager = manager_for(&server);
    (server, manager)
}

fn two_states() -> serde_json::Value {
    json!([
        {
            "entity_id": "light.kitchen",
            "state": "on",
            "attributes": {
                "friendly_name": "Kitchen Light",
                "supported_features": 44
            },
            "last_changed": "2024-03-01T10:30:00+00:00",
            "last_updated": "2024-03-01T10:30:00+00:00"
        },
        {
            "entity_id": "sensor.hall_temp",
            "state": "21.5",
            "attributes": { "friendly_name": "Hall Temperature" }
        }
    ])
}

async fn mock_states(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mock_registry(server: &MockServer, blob: &str) {
    Mock::given(method("POST"))
        .and(path("/api/template"))
        .respond_with(ResponseTemplate::new(200).set_body_string(blob))
        .mount(server)
        .await;
}

// ── Full sync ───────────────────────────────────────────────────────

#[tokio::test]
async fn empty_cache_fills_from_full_sync() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(&server, r#"[{"e":"light.kitchen","a":"kitchen"}]"#).await;

    let saved = manager.sync().await.unwrap();
    assert_eq!(saved, 2);
    assert_eq!(manager.entity_count().unwrap(), 2);

    // Ordered by friendly name: Hall Temperature before Kitchen Light.
    let all = manager.get_entities().unwrap();
    assert_eq!(all[0].entity_id, "sensor.hall_temp");
    assert_eq!(all[1].entity_id, "light.kitchen");

    let kitchen = manager.get_entity("light.kitchen").unwrap().unwrap();
    assert_eq!(kitchen.area_id, "kitchen");
    assert_eq!(kitchen.supported_features, 44);
    let sensor = manager.get_entity("sensor.hall_temp").unwrap().unwrap();
    assert_eq!(sensor.area_id, "");

    assert!(manager.is_online());
    assert!(manager.last_sync() > 0);
    assert!(!manager.should_sync());
    // The sync time is persisted for the next session.
    assert!(manager.store().get_metadata("last_sync").unwrap().is_some());
}

#[tokio::test]
async fn rejected_fetch_keeps_cache_and_flips_offline() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(&server, "[]").await;
    manager.sync().await.unwrap();
    let synced_at = manager.last_sync();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/states"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = manager.sync().await.unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.hub_status(), Some(500));

    // Never wipe cached data on a failed fetch.
    assert_eq!(manager.entity_count().unwrap(), 2);
    assert!(!manager.is_online());
    assert_eq!(manager.last_sync(), synced_at);
}

#[tokio::test]
async fn unreachable_hub_flips_offline() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(&server, "[]").await;
    manager.sync().await.unwrap();
    assert!(manager.is_online());

    drop(server);

    let err = manager.sync().await.unwrap_err();
    assert!(matches!(err, CoreError::HubUnreachable { .. }));
    assert_eq!(manager.entity_count().unwrap(), 2);
    assert!(!manager.is_online());
}

#[tokio::test]
async fn zero_entity_answer_is_a_failed_sync() {
    let (server, manager) = setup().await;
    mock_states(&server, json!([])).await;

    let err = manager.sync().await.unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }));

    // A parse-level failure is not a connectivity verdict: the flags
    // stay where they were.
    assert!(manager.is_online());
    assert_eq!(manager.last_sync(), 0);
    assert_eq!(manager.entity_count().unwrap(), 0);
}

// ── Staleness-driven sync ───────────────────────────────────────────

#[tokio::test]
async fn fresh_cache_skips_sync_if_needed() {
    let server = MockServer::start().await;
    let store = EntityStore::open_in_memory().unwrap();
    let recent = Utc::now().timestamp() - 10;
    store.set_metadata("last_sync", &recent.to_string()).unwrap();
    let manager = CacheManager::new(store, Some(hub_client(&server)));

    // No mocks mounted: a stray request would fail the sync and the test.
    assert_eq!(
        manager.sync_if_needed().await.unwrap(),
        SyncOutcome::Skipped
    );
}

#[tokio::test]
async fn stale_cache_syncs_when_asked() {
    let server = MockServer::start().await;
    let store = EntityStore::open_in_memory().unwrap();
    let stale = Utc::now().timestamp() - 400;
    store.set_metadata("last_sync", &stale.to_string()).unwrap();
    let manager = CacheManager::new(store, Some(hub_client(&server)));
    mock_states(&server, two_states()).await;

    assert!(manager.should_sync());
    assert_eq!(
        manager.sync_if_needed().await.unwrap(),
        SyncOutcome::Synced(2)
    );
    assert!(!manager.should_sync());
}

// ── Single-entity refresh ───────────────────────────────────────────

#[tokio::test]
async fn refresh_saves_live_state() {
    let (server, manager) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/states/light.kitchen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity_id": "light.kitchen",
            "state": "off",
            "attributes": { "friendly_name": "Kitchen Light" }
        })))
        .mount(&server)
        .await;

    let entity = match manager.refresh_entity("light.kitchen").await.unwrap() {
        Refreshed::Live(entity) => entity,
        other => panic!("expected live refresh, got {other:?}"),
    };
    assert_eq!(entity.state, "off");

    let cached = manager.get_entity("light.kitchen").unwrap().unwrap();
    assert_eq!(cached.state, "off");
}

#[tokio::test]
async fn refresh_degrades_to_cache_without_flipping_online() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(&server, "[]").await;
    manager.sync().await.unwrap();

    server.reset().await;

    let outcome = manager.refresh_entity("light.kitchen").await.unwrap();
    assert!(matches!(outcome, Refreshed::Cached(ref e) if e.state == "on"));

    let missing = manager.refresh_entity("light.ghost").await.unwrap();
    assert_eq!(missing, Refreshed::Missing);

    // Refresh failures are per-call outcomes; only full syncs decide
    // the online flag.
    assert!(manager.is_online());
}

#[tokio::test]
async fn unparseable_refresh_answer_falls_back_to_cache() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(&server, "[]").await;
    manager.sync().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/states/light.kitchen"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let outcome = manager.refresh_entity("light.kitchen").await.unwrap();
    assert!(matches!(outcome, Refreshed::Cached(ref e) if e.state == "on"));
}

// ── Area merge ──────────────────────────────────────────────────────

#[tokio::test]
async fn area_pairs_update_known_entities_only() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    mock_registry(
        &server,
        r#"[{"e":"light.kitchen","a":"kitchen"},{"e":"light.ghost","a":"attic"}]"#,
    )
    .await;

    manager.sync().await.unwrap();

    let kitchen = manager.get_entity("light.kitchen").unwrap().unwrap();
    assert_eq!(kitchen.area_id, "kitchen");
    assert!(manager.get_entity("light.ghost").unwrap().is_none());
}

#[tokio::test]
async fn failed_registry_fetch_does_not_fail_sync() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    Mock::given(method("POST"))
        .and(path("/api/template"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert_eq!(manager.sync().await.unwrap(), 2);
    assert!(manager.is_online());
}

#[tokio::test]
async fn registry_outage_on_resync_keeps_merged_areas() {
    let (server, manager) = setup().await;
    mock_states(&server, two_states()).await;
    // The registry answers once, then the endpoint starts failing.
    Mock::given(method("POST"))
        .and(path("/api/template"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"e":"light.kitchen","a":"kitchen"}]"#),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/template"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    manager.sync().await.unwrap();
    assert_eq!(
        manager.get_entity("light.kitchen").unwrap().unwrap().area_id,
        "kitchen"
    );

    assert_eq!(manager.sync().await.unwrap(), 2);
    let kitchen = manager.get_entity("light.kitchen").unwrap().unwrap();
    assert_eq!(kitchen.area_id, "kitchen");
}

// ── Companion facade ────────────────────────────────────────────────

#[tokio::test]
async fn service_call_refreshes_target_entity() {
    let server = MockServer::start().await;
    let companion = Companion::new(manager_for(&server));
    companion
        .manager()
        .store()
        .save_entity(&homedeck_core::Entity {
            entity_id: "light.kitchen".into(),
            state: "on".into(),
            friendly_name: "Kitchen Light".into(),
            icon: String::new(),
            domain: "light".into(),
            area_id: String::new(),
            attributes: serde_json::Map::new(),
            supported_features: 0,
            last_changed: None,
            last_updated: None,
        })
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/services/light/toggle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/states/light.kitchen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity_id": "light.kitchen",
            "state": "off",
            "attributes": { "friendly_name": "Kitchen Light" }
        })))
        .mount(&server)
        .await;

    companion
        .call_service("light", "toggle", Some("light.kitchen"), None)
        .await
        .unwrap();

    let entity = companion.entity("light.kitchen").unwrap().unwrap();
    assert_eq!(entity.state, "off");
}

#[tokio::test]
async fn rejected_service_call_surfaces_status() {
    let server = MockServer::start().await;
    let companion = Companion::new(manager_for(&server));
    Mock::given(method("POST"))
        .and(path("/api/services/light/toggle"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = companion
        .call_service("light", "toggle", Some("light.kitchen"), None)
        .await
        .unwrap_err();
    assert_eq!(err.hub_status(), Some(401));
}

#[tokio::test]
async fn connection_probe_is_live() {
    let server = MockServer::start().await;
    let companion = Companion::new(manager_for(&server));
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "API running."})))
        .mount(&server)
        .await;

    companion.test_connection().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    assert!(companion.test_connection().await.is_err());
}
