#![allow(clippy::unwrap_used)]
// Integration tests for the gateway against a wiremock upstream.
//
// Convergence delays are shrunk to milliseconds instead of pausing the
// clock: the mock server answers over real sockets, and an auto-advancing
// paused clock would fire the HTTP client's timeouts while it waits.

use std::time::Duration;

use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ondus_api::{OndusClient, TransportConfig};
use ondus_core::{
    ApplianceVariant, AuthSession, Credentials, Gateway, GatewayConfig, RequestSerializer,
    poll_once,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn api_path(suffix: &str) -> String {
    format!("/v3/iot/{suffix}")
}

fn credentials() -> Credentials {
    Credentials {
        username: "user@example.com".into(),
        password: SecretString::from("hunter2".to_owned()),
    }
}

fn config_for(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::new(credentials()).unwrap();
    config.base_url = Url::parse(&format!("{}/v3/iot/", server.uri())).unwrap();
    config.snooze_poll_delay = Duration::from_millis(10);
    config.snooze_timeout = Duration::from_millis(100);
    config
}

fn token_body(access: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access,
        "expires_in": expires_in,
        "refresh_token": format!("refresh-{access}"),
        "refresh_expires_in": 15_552_000
    })
}

async fn mount_login(server: &MockServer, expires_in: i64) {
    let html = format!(
        r#"<html><form method="post" action="{}/auth/login?session_code=s1&amp;tab_id=t1"></form></html>"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(api_path("oidc/login")))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;

    let host = server.address();
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            format!("ondus://{host}/v3/iot/oidc/token-exchange?code=abc").as_str(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(api_path("oidc/token-exchange")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", expires_in)))
        .mount(server)
        .await;
}

fn guard_json(snoozed_until: Option<&str>) -> Value {
    json!({
        "appliance_id": "g-1",
        "name": "Main valve",
        "type": 103,
        "tdt": "2024-05-01T08:00:00Z",
        "snoozed_until": snoozed_until,
    })
}

/// One location, two rooms: a valve guard in the cellar and an
/// unrecognised appliance in the kitchen.
async fn mount_graph(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(api_path("locations")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Home"}])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "Cellar"},
            {"id": 11, "name": "Kitchen"}
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms/11/appliances")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"appliance_id": "b-1", "name": "Blue", "type": 104}])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/status")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"type": "connection", "value": 1}])),
        )
        .mount(server)
        .await;
}

async fn mount_guard(server: &MockServer, snoozed_until: Option<&str>, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms/10/appliances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([guard_json(snoozed_until)])));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

async fn setup() -> (MockServer, Gateway) {
    let server = MockServer::start().await;
    mount_login(&server, 3600).await;
    let gateway = Gateway::new(config_for(&server)).unwrap();
    (server, gateway)
}

fn notification(i: usize) -> Value {
    json!({
        "notification_id": format!("n-{i:02}"),
        "appliance_id": "g-1",
        "location_id": 1,
        "category": 20,
        "notification_type": 11,
        "is_read": false,
        "timestamp": format!("2024-05-01T10:{i:02}:00Z"),
    })
}

// ── Appliance graph ─────────────────────────────────────────────────

#[tokio::test]
async fn test_graph_skips_unknown_appliances() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms/11/appliances/b-1/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let appliances = lease.appliances().get_appliances().await.unwrap();

    assert_eq!(appliances.len(), 1);
    let guard = &appliances["g-1"];
    assert_eq!(guard.name, "Main valve");
    assert_eq!(guard.room.name, "Cellar");
    assert_eq!(guard.location.name, "Home");
    assert_eq!(guard.status["connection"], 1);
    assert!(!guard.is_snoozed());
}

#[tokio::test]
async fn test_graph_is_cached_within_ttl() {
    let server = MockServer::start().await;
    mount_login(&server, 3600).await;
    Mock::given(method("GET"))
        .and(path(api_path("locations")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Home"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let gateway = Gateway::new(config_for(&server)).unwrap();

    for _ in 0..2 {
        let lease = gateway.lease().await.unwrap();
        let appliances = lease.appliances().get_appliances().await.unwrap();
        assert!(appliances.is_empty());
    }
}

#[tokio::test]
async fn test_filtered_views() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;

    let lease = gateway.lease().await.unwrap();
    let directory = lease.appliances();

    let guards = directory
        .get_appliances_of(ApplianceVariant::ValveGuard, Some(1), None)
        .await
        .unwrap();
    assert_eq!(guards.len(), 1);

    let sensors = directory
        .get_appliances_of(ApplianceVariant::LeakSensor, None, None)
        .await
        .unwrap();
    assert!(sensors.is_empty());

    let elsewhere = directory
        .get_appliances_of(ApplianceVariant::Any, Some(2), None)
        .await
        .unwrap();
    assert!(elsewhere.is_empty());

    // Not a Sense, so no Sense details.
    assert!(directory.get_sense_details("g-1").await.unwrap().is_none());
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_happens_at_half_life() {
    let server = MockServer::start().await;
    mount_login(&server, 3600).await;
    Mock::given(method("POST"))
        .and(path(api_path("oidc/token")))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let base_url = Url::parse(&format!("{}/v3/iot/", server.uri())).unwrap();
    let client = OndusClient::new(base_url, &TransportConfig::default().with_cookie_jar()).unwrap();
    let session = AuthSession::new(credentials());
    let serializer = RequestSerializer::new();
    let ticket = serializer.acquire().await;

    session.login(&ticket, &client).await.unwrap();
    let issued_at = session.tokens().unwrap().issued_at;

    // Just before the half-life: nothing happens.
    session
        .ensure_fresh_at(&ticket, &client, issued_at + TimeDelta::seconds(1799))
        .await
        .unwrap();
    assert_eq!(session.tokens().unwrap().access_token.expose_secret(), "access-1");

    session
        .ensure_fresh_at(&ticket, &client, issued_at + TimeDelta::seconds(1801))
        .await
        .unwrap();
    assert_eq!(session.tokens().unwrap().access_token.expose_secret(), "access-2");
}

#[tokio::test]
async fn test_rejected_refresh_falls_back_to_login() {
    let server = MockServer::start().await;
    // A zero lifetime makes the token due immediately.
    mount_login(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(api_path("oidc/token")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let gateway = Gateway::new(config_for(&server)).unwrap();

    gateway.connect().await.unwrap();
    let lease = gateway.lease().await.unwrap();

    assert!(lease.ticket().is_held());
    assert!(gateway.session().tokens().is_some());
}

#[tokio::test]
async fn test_refresh_server_error_does_not_log_in_again() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;
    Mock::given(method("POST"))
        .and(path(api_path("oidc/token")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    let gateway = Gateway::new(config_for(&server)).unwrap();

    gateway.connect().await.unwrap();
    let err = gateway.lease().await.unwrap_err();

    assert!(matches!(
        err,
        ondus_core::CoreError::Upstream {
            status: Some(503),
            ..
        }
    ));
    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == api_path("oidc/login"))
        .count();
    assert_eq!(logins, 1);
    assert!(gateway.session().tokens().is_some());
}

#[tokio::test]
async fn test_connect_surfaces_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("oidc/login")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;
    let gateway = Gateway::new(config_for(&server)).unwrap();

    let err = gateway.connect().await.unwrap_err();
    assert!(matches!(err, ondus_core::CoreError::AuthenticationFailed { .. }));
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn test_notifications_page_twenty_then_ten() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;

    let first: Vec<Value> = (0..20).map(notification).collect();
    let second: Vec<Value> = (20..25).map(notification).collect();
    Mock::given(method("GET"))
        .and(path(api_path("profile/notifications")))
        .and(query_param("pageSize", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "continuation_token": "tok",
            "remaining_notifications": 5,
            "notifications": first,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("profile/notifications")))
        .and(query_param("pageSize", "10"))
        .and(query_param("continuationToken", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "continuation_token": null,
            "remaining_notifications": 0,
            "notifications": second,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let notifications = lease.notifications().get_notifications(None).await.unwrap();

    assert_eq!(notifications.len(), 25);
    assert_eq!(notifications[0].id, "n-24");
    assert_eq!(notifications[24].id, "n-00");
    assert_eq!(notifications[0].appliance_name, "Main valve");
    assert_eq!(notifications[0].location_name, "Home");
    assert_eq!(notifications[0].message, "Battery low");

    // Served from the cache: the page mocks expect exactly one call each.
    let again = lease.notifications().get_notifications(Some(1)).await.unwrap();
    assert_eq!(again.len(), 25);
    assert!(lease.notifications().get_notifications(Some(2)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_next_after_marks_as_read() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("GET"))
        .and(path(api_path("profile/notifications")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "remaining_notifications": 0,
            "notifications": [notification(5), notification(7), notification(9)],
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(api_path("profile/notifications/n-07")))
        .and(body_partial_json(json!({"id": "n-07", "is_read": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let after = "2024-05-01T10:05:00Z".parse().unwrap();
    let next = lease
        .notifications()
        .next_after(after, None, true, false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(next.id, "n-07");
    assert!(next.is_read);
}

#[tokio::test]
async fn test_failed_mutation_still_flushes() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("GET"))
        .and(path(api_path("profile/notifications")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "remaining_notifications": 0,
            "notifications": [notification(1)],
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api_path("profile/notifications/n-01")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let notifications = lease.notifications();
    notifications.get_notifications(None).await.unwrap();
    assert!(lease.cache().contains("notifications|notifications"));

    assert!(!notifications.delete("n-01").await);
    assert!(!lease.cache().contains("notifications|notifications"));
}

#[tokio::test]
async fn test_watcher_flushes_on_new_notification() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("GET"))
        .and(path(api_path("profile/notifications")))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "remaining_notifications": 4,
            "continuation_token": "tok",
            "notifications": [notification(4)],
        })))
        .mount(&server)
        .await;

    {
        let lease = gateway.lease().await.unwrap();
        lease.appliances().get_appliances().await.unwrap();
        assert!(lease.cache().contains("appliances|appliances"));
    }

    let mut published = gateway.latest_notification();
    let mut latest = None;
    assert!(poll_once(&gateway, &mut latest).await.unwrap());
    assert_eq!(latest.as_deref(), Some("n-04"));
    assert!(published.has_changed().unwrap());
    assert_eq!(published.borrow_and_update().as_deref(), Some("n-04"));
    assert!(!gateway.cache().contains("appliances|appliances"));

    assert!(!poll_once(&gateway, &mut latest).await.unwrap());
}

// ── Actuation ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_snooze_converges() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    // The first graph build sees an awake valve; every later one sees it snoozed.
    mount_guard(&server, None, Some(1)).await;
    mount_guard(&server, Some("2099-01-01T00:00:00Z"), None).await;
    Mock::given(method("PUT"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/snooze")))
        .and(body_partial_json(json!({"snooze_duration": 30})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    assert!(lease.actuation().snooze("g-1", 30).await);
    assert!(!lease.cache().contains("appliances|appliances"));

    let states = lease.actuation().snooze_states(None, None).await.unwrap();
    assert_eq!(states.len(), 1);
    assert!(states[0].snoozing);
    assert!(states[0].remaining_secs > 0);
}

#[tokio::test]
async fn test_snooze_of_snoozed_valve_wakes_it_first() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    // Snoozed at first, awake once the wake is confirmed, snoozed again after.
    mount_guard(&server, Some("2099-01-01T00:00:00Z"), Some(1)).await;
    mount_guard(&server, None, Some(1)).await;
    mount_guard(&server, Some("2099-01-01T00:00:00Z"), None).await;
    let snooze_path = api_path("locations/1/rooms/10/appliances/g-1/snooze");
    Mock::given(method("DELETE"))
        .and(path(snooze_path.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(snooze_path.as_str()))
        .and(body_partial_json(json!({"snooze_duration": 45})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    assert!(lease.actuation().snooze("g-1", 45).await);

    let commands: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == snooze_path)
        .map(|r| r.method.to_string())
        .collect();
    assert_eq!(commands, ["DELETE", "PUT"]);
}

#[tokio::test]
async fn test_snooze_times_out() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("PUT"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/snooze")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    assert!(!lease.actuation().snooze("g-1", 30).await);
    assert!(!lease.cache().contains("appliances|appliances"));
    assert!(!lease.cache().contains("appliances|locations"));
}

#[tokio::test]
async fn test_snooze_of_unknown_appliance_fails_without_command() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    assert!(!lease.actuation().snooze("missing", 30).await);
    assert!(!lease.actuation().snooze("g-1", 0).await);
}

#[tokio::test]
async fn test_rejected_wake_aborts_immediately() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, Some("2099-01-01T00:00:00Z"), None).await;
    Mock::given(method("DELETE"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/snooze")))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    assert!(!lease.actuation().wake("g-1").await);
}

#[tokio::test]
async fn test_batch_wake_with_zero_minutes() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, Some("2099-01-01T00:00:00Z"), Some(1)).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("DELETE"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/snooze")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let outcome = lease
        .actuation()
        .set_snooze_all(Some(1), None, 0)
        .await
        .unwrap()
        .unwrap();

    assert!(!outcome.partial_failure);
    assert_eq!(outcome.states.len(), 1);
    assert!(!outcome.states[0].snoozing);

    let none = lease.actuation().set_snooze_all(Some(2), None, 5).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_close_valve_rewrites_command() {
    let (server, gateway) = setup().await;
    mount_graph(&server).await;
    mount_guard(&server, None, None).await;
    Mock::given(method("GET"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/command")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "appliance_id": "g-1",
            "type": 103,
            "command": {"valve_open": true, "buzzer_on": false, "measure_now": false},
            "commandb64": "AAEC",
            "timestamp": "2024-05-01T10:00:00Z",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("locations/1/rooms/10/appliances/g-1/command")))
        .and(body_partial_json(json!({"command": {"valve_open": false}})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let lease = gateway.lease().await.unwrap();
    let actuation = lease.actuation();
    assert_eq!(actuation.get_valve_open("g-1").await.unwrap(), Some(true));
    assert_eq!(actuation.get_valve_open("missing").await.unwrap(), None);

    let outcome = actuation.set_valves(None, None, false).await.unwrap().unwrap();
    assert!(!outcome.partial_failure);
    assert!(!outcome.states[0].open);

    // Already open: no command is sent.
    let unchanged = actuation.set_valves(None, Some("g-1"), true).await.unwrap().unwrap();
    assert!(unchanged.states[0].open);
    assert!(!unchanged.partial_failure);
}
