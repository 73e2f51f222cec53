mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::eventually;
use common::fake_input::FakeInput;
use common::fake_link::FakeLinkFactory;
use common::fake_registry::{FakeRegistry, udp_record};
use padlink_api::{ConnectionState, EndpointId, TransportKind};
use padlink_station::configs::settings::Settings;
use padlink_station::errors::TransportError;
use padlink_station::input::{DeviceId, InputDeviceRegistry, RawEvent};
use padlink_station::services::{Orchestrator, SessionOutcome, StationIdentity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::timeout;

struct Fixture {
    registry: FakeRegistry,
    input: FakeInput,
    links: FakeLinkFactory,
    orchestrator: Orchestrator,
}

fn fixture() -> Fixture {
    let registry = FakeRegistry::default();
    let input = FakeInput::new();
    let links = FakeLinkFactory::new();
    let identity = StationIdentity {
        id: "station-1".into(),
        name: "Station 1".into(),
        alliance: None,
        endpoint_type: "XRP".into(),
    };
    let orchestrator = Orchestrator::new(
        &Settings::default(),
        identity,
        Arc::new(registry.clone()),
        InputDeviceRegistry::new(input.backend()),
        Arc::new(links.clone()),
        None,
    );

    Fixture {
        registry,
        input,
        links,
        orchestrator,
    }
}

fn bound_to(orchestrator: &Orchestrator, device: &str) -> Option<String> {
    orchestrator
        .bindings()
        .endpoint_for(&DeviceId::from(device))
        .map(|e| e.0.clone())
}

#[tokio::test]
async fn test_devices_bind_in_discovery_order() {
    let mut f = fixture();
    f.registry.set(vec![
        udp_record("xrp-1", "10.0.0.1"),
        udp_record("xrp-2", "10.0.0.2"),
        udp_record("xrp-3", "10.0.0.3"),
    ]);
    f.input.attach("pad-a");
    f.input.attach("pad-b");

    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;

    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-1"));
    assert_eq!(bound_to(&f.orchestrator, "pad-b").as_deref(), Some("xrp-2"));
    assert_eq!(f.orchestrator.session_count(), 2);
    assert!(f.orchestrator.bindings().is_consistent());

    f.orchestrator.shutdown().await;
    assert!(f.orchestrator.bindings().is_empty());
}

#[tokio::test]
async fn test_input_reaches_bound_endpoint() {
    let mut f = fixture();
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1"), udp_record("xrp-2", "10.0.0.2")]);
    f.input.attach("pad-a");
    f.input.attach("pad-b");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;

    f.input.push("pad-b", RawEvent::Button { code: 0, pressed: true });
    f.input.push("pad-b", RawEvent::Axis { code: 0, value: 0.5 });
    f.orchestrator.pump_input();

    let log = f.links.log("xrp-2");
    assert!(eventually(|| log.frames().len() == 2).await);
    assert_eq!(log.frames(), vec!["EV:BA:1\n", "EV:LX:0.50\n"]);
    assert!(f.links.log("xrp-1").frames().is_empty());

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_removed_endpoint_releases_device_for_rebinding() {
    let mut f = fixture();
    f.registry.set(vec![
        udp_record("xrp-1", "10.0.0.1"),
        udp_record("xrp-2", "10.0.0.2"),
        udp_record("xrp-3", "10.0.0.3"),
    ]);
    f.input.attach("pad-a");
    f.input.attach("pad-b");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;

    f.registry.set(vec![udp_record("xrp-2", "10.0.0.2"), udp_record("xrp-3", "10.0.0.3")]);
    f.orchestrator.refresh_endpoints().await;

    let ids: Vec<&str> = f.orchestrator.endpoints().iter().map(|e| e.id.0.as_str()).collect();
    assert_eq!(ids, vec!["xrp-2", "xrp-3"]);
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-3"));
    assert_eq!(bound_to(&f.orchestrator, "pad-b").as_deref(), Some("xrp-2"));
    assert!(eventually(|| f.links.log("xrp-1").closes.load(Ordering::SeqCst) >= 1).await);

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_changed_endpoint_restarts_session() {
    let mut f = fixture();
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;
    let log = f.links.log("xrp-1");
    assert!(eventually(|| log.open_count() == 1).await);

    let mut moved = udp_record("xrp-1", "10.0.0.9");
    moved.protocol = "tcp".into();
    f.registry.set(vec![moved]);
    f.orchestrator.refresh_endpoints().await;

    let endpoint = &f.orchestrator.endpoints()[0];
    assert_eq!(endpoint.transport, TransportKind::Tcp);
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-1"));
    assert!(eventually(|| log.open_count() == 2).await);

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_malformed_record_is_isolated() {
    let mut f = fixture();
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1"), udp_record("xrp-2", "10.0.0.2")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;
    let log = f.links.log("xrp-1");
    assert!(eventually(|| log.open_count() == 1).await);

    let mut broken = udp_record("xrp-1", "10.0.0.1");
    broken.port = "not-a-port".into();
    let mut unknown = udp_record("xrp-9", "10.0.0.9");
    unknown.protocol = "carrier-pigeon".into();
    f.registry.set(vec![broken, unknown, udp_record("xrp-2", "10.0.0.2")]);
    f.orchestrator.refresh_endpoints().await;

    let ids: Vec<&str> = f.orchestrator.endpoints().iter().map(|e| e.id.0.as_str()).collect();
    assert_eq!(ids, vec!["xrp-1", "xrp-2"]);
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-1"));
    assert_eq!(f.orchestrator.session_count(), 1);
    assert_eq!(log.closes.load(Ordering::SeqCst), 0);

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_detached_device_releases_endpoint() {
    let mut f = fixture();
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;
    assert_eq!(f.orchestrator.bindings().len(), 1);

    f.input.detach("pad-a");
    f.input.attach("pad-b");
    f.orchestrator.reconcile_input_devices().await;

    assert_eq!(bound_to(&f.orchestrator, "pad-a"), None);
    assert_eq!(bound_to(&f.orchestrator, "pad-b").as_deref(), Some("xrp-1"));
    assert_eq!(f.orchestrator.session_count(), 1);

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_failed_session_releases_binding() {
    let mut f = fixture();
    f.links.refuse("xrp-1");
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-1"));

    let report = timeout(Duration::from_secs(2), f.orchestrator.next_report())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.endpoint, EndpointId::from("xrp-1"));
    assert_eq!(
        report.outcome,
        SessionOutcome::Failed(TransportError::Refused("xrp-1".into()))
    );

    f.orchestrator.handle_report(report).await;
    assert!(f.orchestrator.bindings().is_empty());
    assert_eq!(f.orchestrator.session_count(), 0);
    assert_eq!(
        f.orchestrator.connection_state(&EndpointId::from("xrp-1")),
        ConnectionState::Failed
    );
}

#[tokio::test]
async fn test_failed_endpoint_is_skipped_until_its_record_changes() {
    let mut f = fixture();
    f.links.refuse("xrp-1");
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1"), udp_record("xrp-2", "10.0.0.2")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-1"));

    let report = timeout(Duration::from_secs(2), f.orchestrator.next_report())
        .await
        .unwrap()
        .unwrap();
    f.orchestrator.handle_report(report).await;

    let refusing = EndpointId::from("xrp-1");
    assert_eq!(f.orchestrator.connection_state(&refusing), ConnectionState::Failed);
    assert_eq!(f.orchestrator.failure(&refusing), Some("Connection refused by xrp-1"));
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-2"));

    for _ in 0..3 {
        f.orchestrator.reconcile_input_devices().await;
        f.orchestrator.refresh_endpoints().await;
    }
    let healthy = f.links.log("xrp-2");
    assert!(eventually(|| healthy.open_count() == 1).await);
    assert_eq!(f.links.log("xrp-1").open_count(), 1);
    assert_eq!(bound_to(&f.orchestrator, "pad-a").as_deref(), Some("xrp-2"));

    // A new address makes the endpoint worth another try
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.9"), udp_record("xrp-2", "10.0.0.2")]);
    f.orchestrator.refresh_endpoints().await;
    assert_eq!(f.orchestrator.failure(&refusing), None);

    f.input.attach("pad-b");
    f.orchestrator.reconcile_input_devices().await;
    assert_eq!(bound_to(&f.orchestrator, "pad-b").as_deref(), Some("xrp-1"));
    assert!(eventually(|| f.links.log("xrp-1").open_count() == 2).await);

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_status_registers_once() {
    let mut f = fixture();
    f.registry.set(vec![udp_record("xrp-1", "10.0.0.1")]);
    f.input.attach("pad-a");
    f.orchestrator.refresh_endpoints().await;
    f.orchestrator.reconcile_input_devices().await;

    f.orchestrator.report_status().await;
    f.orchestrator.report_status().await;

    let registrations = f.registry.registrations.lock().unwrap().clone();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].hardware_id, "station-1");
    let statuses = f.registry.statuses.lock().unwrap().clone();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[1].status, "Running: 1 devices, 1 endpoints, 1 bindings");

    f.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_bindings_stay_consistent_under_churn() {
    let mut f = fixture();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let hosts = ["10.0.0.1", "10.0.0.2"];

    for _ in 0..60 {
        match rng.random_range(0..4) {
            0 => {
                let id = format!("pad-{}", rng.random_range(0..4));
                if f.input.attached().contains(&DeviceId(id.clone())) {
                    f.input.detach(&id);
                } else {
                    f.input.attach(&id);
                }
                f.orchestrator.reconcile_input_devices().await;
            }
            1 | 2 => {
                let mut records = Vec::new();
                for n in 0..5 {
                    if rng.random_bool(0.6) {
                        let host = hosts[rng.random_range(0..hosts.len())];
                        records.push(udp_record(&format!("xrp-{n}"), host));
                    }
                }
                f.registry.set(records);
                f.orchestrator.refresh_endpoints().await;
            }
            _ => f.orchestrator.pump_input(),
        }

        let bindings = f.orchestrator.bindings();
        assert!(bindings.is_consistent());
        for (device, endpoint) in bindings.iter() {
            assert!(f.orchestrator.inputs().contains(device));
            assert!(f.orchestrator.endpoints().iter().any(|e| &e.id == endpoint));
        }
        assert_eq!(f.orchestrator.session_count(), bindings.len());

        let free_devices = f
            .orchestrator
            .inputs()
            .device_ids()
            .filter(|d| !bindings.is_device_bound(d))
            .count();
        let free_endpoints = f
            .orchestrator
            .endpoints()
            .iter()
            .filter(|e| !bindings.is_endpoint_bound(&e.id))
            .count();
        assert!(free_devices == 0 || free_endpoints == 0);
    }

    f.orchestrator.shutdown().await;
    assert!(f.orchestrator.bindings().is_empty());
}
