//! Integration tests against a mocked hub using wiremock.

use std::io;
use std::time::Duration;

use hue_control_lib::control_interface::{HubClient, HubSession};
use hue_control_lib::light::color_sweep::{ColorAnimator, SweepConfig};
use hue_control_lib::light::gamut::{GamutRegistry, XyPoint};
use hue_control_lib::light::light_ref::LightRef;
use hue_control_lib::light::light_state::LightStateUpdate;
use hue_control_lib::sensor::button_watcher::{ButtonWatcher, Transition, WatchConfig};
use hue_control_lib::util::auth::{PairingFlow, PairingOutcome, TokenStore};
use hue_control_lib::util::error::HubError;
use serde_json::{json, Value};
use tokio::time::Instant;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "tok123";

#[derive(Default)]
struct MemoryStore {
    token: Option<String>,
    saves: usize,
}

impl TokenStore for MemoryStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.token.clone())
    }

    fn save(&mut self, token: &str) -> io::Result<()> {
        self.token = Some(token.to_string());
        self.saves += 1;
        Ok(())
    }
}

fn client_for(server: &MockServer) -> HubClient {
    HubClient::new(HubSession::new(server.uri(), TOKEN)).unwrap()
}

fn lights_json() -> Value {
    json!({
        "1": {
            "name": "Hue color lamp 1",
            "capabilities": {"control": {"colorgamut": [[0.704, 0.296], [0.2151, 0.7106], [0.138, 0.08]], "colorgamuttype": "A"}}
        },
        "2": {
            "name": "Hue color lamp 2",
            "capabilities": {"control": {"colorgamut": [[0.6915, 0.3083], [0.17, 0.7], [0.1532, 0.0475]], "colorgamuttype": "C"}}
        }
    })
}

fn success_for(light: &str) -> Value {
    json!([
        {"success": {format!("/lights/{}/state/on", light): true}}
    ])
}

async fn put_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "PUT")
        .collect()
}

mod pairing {
    use super::*;

    #[tokio::test]
    async fn pending_link_button_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/"))
            .and(body_json(json!({"devicetype": "[bob]"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 101, "address": "", "description": "link button not pressed"}}
            ])))
            .mount(&server)
            .await;

        let client = HubClient::new(HubSession::unpaired(server.uri())).unwrap();
        let mut store = MemoryStore {
            token: Some("old".to_string()),
            saves: 0,
        };
        let mut asked = false;
        let mut confirm = |_: &str, _: &str| {
            asked = true;
            true
        };

        let err = PairingFlow::new(&client)
            .pair("bob", &mut store, &mut confirm)
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::LinkButtonPending));
        assert!(err.is_retryable());
        assert!(!asked);
        assert_eq!(store.token.as_deref(), Some("old"));
        assert_eq!(store.saves, 0);
    }

    #[tokio::test]
    async fn success_is_persisted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"success": {"bob": "tok123"}}])),
            )
            .mount(&server)
            .await;

        let client = HubClient::new(HubSession::unpaired(server.uri())).unwrap();
        let mut store = MemoryStore::default();
        let mut confirm = |_: &str, _: &str| -> bool { panic!("nothing to overwrite") };

        let outcome = PairingFlow::new(&client)
            .pair("bob", &mut store, &mut confirm)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PairingOutcome::Stored {
                name: "bob".to_string(),
                token: "tok123".to_string()
            }
        );
        assert_eq!(store.token.as_deref(), Some("tok123"));
        assert_eq!(store.saves, 1);
    }

    #[tokio::test]
    async fn existing_token_needs_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"success": {"bob": "tok456"}}])),
            )
            .mount(&server)
            .await;

        let client = HubClient::new(HubSession::unpaired(server.uri())).unwrap();
        let flow = PairingFlow::new(&client);
        let mut store = MemoryStore {
            token: Some("tok123".to_string()),
            saves: 0,
        };

        let mut seen = Vec::new();
        let mut decline = |existing: &str, replacement: &str| {
            seen.push((existing.to_string(), replacement.to_string()));
            false
        };
        let outcome = flow.pair("bob", &mut store, &mut decline).await.unwrap();
        assert!(matches!(outcome, PairingOutcome::Declined { .. }));
        assert_eq!(outcome.token(), "tok456");
        assert_eq!(seen, vec![("tok123".to_string(), "tok456".to_string())]);
        assert_eq!(store.token.as_deref(), Some("tok123"));
        assert_eq!(store.saves, 0);

        let mut accept = |_: &str, _: &str| true;
        let outcome = flow.pair("bob", &mut store, &mut accept).await.unwrap();
        assert!(matches!(outcome, PairingOutcome::Stored { .. }));
        assert_eq!(store.token.as_deref(), Some("tok456"));
        assert_eq!(store.saves, 1);
    }

    #[tokio::test]
    async fn other_hub_error_is_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 7, "address": "/devicetype", "description": "invalid value, [], for parameter, devicetype"}}
            ])))
            .mount(&server)
            .await;

        let client = HubClient::new(HubSession::unpaired(server.uri())).unwrap();
        let mut store = MemoryStore::default();
        let err = PairingFlow::new(&client)
            .pair("", &mut store, &mut |_: &str, _: &str| true)
            .await
            .unwrap_err();
        match err {
            HubError::Hub { description, .. } => {
                assert_eq!(description, "invalid value, [], for parameter, devicetype")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.saves, 0);
    }
}

mod client {
    use super::*;

    #[tokio::test]
    async fn unauthorized_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tok123/lights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 1, "address": "/", "description": "unauthorized user"}}
            ])))
            .mount(&server)
            .await;

        let err = client_for(&server).get_lights().await.unwrap_err();
        assert!(matches!(err, HubError::Unauthorized));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hub</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_lights().await.unwrap_err();
        assert!(matches!(err, HubError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let client = HubClient::with_timeout(
            HubSession::new("127.0.0.1:1", TOKEN),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.get_lights().await.unwrap_err();
        assert!(matches!(err, HubError::Network(_)));
    }

    #[tokio::test]
    async fn unpaired_session_sends_nothing() {
        let server = MockServer::start().await;
        let client = HubClient::new(HubSession::unpaired(server.uri())).unwrap();
        let err = client.get_lights().await.unwrap_err();
        assert!(matches!(err, HubError::NotPaired));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_state_sends_single_field_and_on() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/tok123/lights/2/state"))
            .and(body_json(json!({"bri": 128, "on": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"success": {"/lights/2/state/bri": 128}},
                {"success": {"/lights/2/state/on": true}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client_for(&server)
            .set_light_state(&LightRef::new("2"), LightStateUpdate::Brightness(128))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }
}

mod color_sweep {
    use super::*;

    #[tokio::test]
    async fn one_tick_puts_each_light_inside_its_gamut() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tok123/lights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lights_json()))
            .mount(&server)
            .await;
        for light in ["1", "2"] {
            Mock::given(method("PUT"))
                .and(path(format!("/api/tok123/lights/{}/state", light)))
                .respond_with(ResponseTemplate::new(200).set_body_json(success_for(light)))
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        let registry = GamutRegistry::build(&client.get_lights().await.unwrap()).unwrap();
        let animator = ColorAnimator::new(client, registry.clone());

        let report = animator.tick(Duration::from_millis(3700)).await;
        assert!(report.is_clean());
        assert_eq!(report.updated, vec![LightRef::new("1"), LightRef::new("2")]);

        let puts = put_requests(&server).await;
        assert_eq!(puts.len(), 2);
        for request in puts {
            let light = request
                .url
                .path()
                .trim_start_matches("/api/tok123/lights/")
                .trim_end_matches("/state")
                .to_string();
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(body["on"], true);
            let xy: XyPoint = serde_json::from_value(body["xy"].clone()).unwrap();
            let gamut = registry.get(&LightRef::new(light.as_str())).unwrap();
            assert!(gamut.contains(xy, 1e-9), "light {} got {:?}", light, xy);
        }
    }

    #[tokio::test]
    async fn rejected_light_does_not_stop_the_others() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/tok123/lights/1/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 201, "address": "/lights/1/state/xy", "description": "parameter, xy, is not modifiable. Device is set to off."}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/tok123/lights/2/state"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_for("2")))
            .mount(&server)
            .await;

        let registry = GamutRegistry::build(lights_json().as_object().unwrap()).unwrap();
        let animator = ColorAnimator::new(client_for(&server), registry);
        let report = animator.tick(Duration::ZERO).await;

        assert_eq!(report.updated, vec![LightRef::new("2")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, LightRef::new("1"));
        assert!(matches!(report.failed[0].1, HubError::Hub { kind: 201, .. }));
    }

    #[tokio::test]
    async fn started_sweep_stops_on_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_for("1")))
            .mount(&server)
            .await;

        let registry = GamutRegistry::build(lights_json().as_object().unwrap()).unwrap();
        let sweep = ColorAnimator::new(client_for(&server), registry)
            .with_config(SweepConfig {
                lap: Duration::from_millis(500),
                tick: Duration::from_millis(10),
            })
            .start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        sweep.stop().await.unwrap();

        let sent = put_requests(&server).await.len();
        assert!(sent >= 4, "only {} updates sent", sent);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(put_requests(&server).await.len(), sent);
    }

    #[tokio::test]
    async fn revoked_token_ends_sweep() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 1, "address": "/", "description": "unauthorized user"}}
            ])))
            .mount(&server)
            .await;

        let registry = GamutRegistry::build(lights_json().as_object().unwrap()).unwrap();
        let sweep = ColorAnimator::new(client_for(&server), registry).start();
        let result = tokio::time::timeout(Duration::from_secs(5), sweep.join())
            .await
            .unwrap();
        assert!(matches!(result, Err(HubError::Unauthorized)));
    }
}

mod button_watcher {
    use super::*;

    async fn mount_button_events(server: &MockServer, events: &[(i64, u64)]) {
        for (code, times) in events {
            Mock::given(method("GET"))
                .and(path("/api/tok123/sensors/4"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "name": "Dimmer switch",
                    "type": "ZLLSwitch",
                    "state": {"buttonevent": code, "lastupdated": "2021-01-10T18:02:11"}
                })))
                .up_to_n_times(*times)
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn long_press_drives_hue_sweep() {
        let server = MockServer::start().await;
        mount_button_events(&server, &[(1000, 1), (4003, 3), (1000, 1)]).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_for("3")))
            .mount(&server)
            .await;

        let mut watcher = ButtonWatcher::new(
            client_for(&server),
            "4",
            vec![LightRef::new("3"), LightRef::new("4")],
        );
        let config = WatchConfig::default();
        let start = Instant::now();
        let mut transitions = Vec::new();
        let mut delays = Vec::new();
        for i in 0..5u64 {
            let outcome = watcher
                .poll(start + Duration::from_millis(200 * i))
                .await
                .unwrap();
            transitions.push(outcome.transition);
            delays.push(outcome.next_poll);
        }

        assert_eq!(
            transitions,
            vec![
                Transition::Idle,
                Transition::PressStarted,
                Transition::PressHeld,
                Transition::PressHeld,
                Transition::PressEnded,
            ]
        );
        assert_eq!(
            delays,
            vec![
                config.idle_poll,
                config.active_poll,
                config.active_poll,
                config.active_poll,
                config.idle_poll,
            ]
        );

        let puts = put_requests(&server).await;
        assert_eq!(puts.len(), 6);
        let hues_for_light_3: Vec<i64> = puts
            .iter()
            .filter(|request| request.url.path() == "/api/tok123/lights/3/state")
            .map(|request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                assert_eq!(body["on"], true);
                body["hue"].as_i64().unwrap()
            })
            .collect();
        // The press started at the second poll, so elapsed time is 0, 200 and 400 ms.
        assert_eq!(hues_for_light_3, vec![0, 819, 1638]);
    }

    #[tokio::test]
    async fn failed_sensor_poll_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tok123/sensors/4"))
            .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_button_events(&server, &[(1002, 100)]).await;

        let config = WatchConfig {
            idle_poll: Duration::from_millis(10),
            active_poll: Duration::from_millis(10),
            ..WatchConfig::default()
        };
        let watch = ButtonWatcher::with_config(client_for(&server), "4", vec![], config).start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!watch.is_finished());
        watch.stop().await.unwrap();

        let polls = server.received_requests().await.unwrap().len();
        assert!(polls >= 3, "only {} polls", polls);
    }

    #[tokio::test]
    async fn revoked_token_ends_watch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 1, "address": "/", "description": "unauthorized user"}}
            ])))
            .mount(&server)
            .await;

        let watch = ButtonWatcher::new(client_for(&server), "4", vec![LightRef::new("1")]).start();
        let result = tokio::time::timeout(Duration::from_secs(5), watch.join())
            .await
            .unwrap();
        assert!(matches!(result, Err(HubError::Unauthorized)));
    }
}
