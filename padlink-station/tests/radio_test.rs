mod common;

use std::sync::Arc;
use std::time::Duration;

use common::eventually_within;
use common::fake_radio::FakeRadio;
use padlink_api::signal::stop_channel;
use padlink_api::{ConnectionState, TransportKind};
use padlink_station::configs::settings::Radio;
use padlink_station::errors::{RadioError, TransportError};
use padlink_station::radio::{Advertisement, RadioScanner};
use padlink_station::transport::{RadioLink, RetryPolicy, TransportConnector};
use tokio::time::Instant;

const PATIENCE: Duration = Duration::from_secs(60);

fn settings() -> Radio {
    Radio {
        enabled: true,
        scan_window_secs: 1,
        error_backoff_secs: 3,
        rest_ms: 1000,
        ..Radio::default()
    }
}

fn scanner(radio: &FakeRadio) -> Arc<RadioScanner> {
    Arc::new(RadioScanner::new(Arc::new(radio.clone()), settings()))
}

async fn cached(scanner: &RadioScanner, name: &str) -> bool {
    scanner.cached_names().await.iter().any(|n| n == name)
}

#[tokio::test(start_paused = true)]
async fn test_scan_backs_off_after_adapter_error() {
    let radio = FakeRadio::new(&["XRP-1"]);
    radio.fail_scans(vec![RadioError::Adapter("powered off".into())]);
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let task = tokio::spawn(scanner.clone().run(stop));

    assert!(eventually_within(PATIENCE, || radio.scan_count() >= 3).await);
    stop_tx.send(true).unwrap();
    task.await.unwrap();

    let times = radio.scan_times();
    assert!(times[1] - times[0] >= Duration::from_secs(3));
    let rested = times[2] - times[1];
    assert!(rested >= Duration::from_millis(1000));
    assert!(rested < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_allow_list_replaces_prefix_match() {
    let radio = FakeRadio::new(&["Rover-9", "XRP-1"]);
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let task = tokio::spawn(scanner.clone().run(stop));

    assert!(eventually_within(PATIENCE, || !radio.accepted().is_empty()).await);
    assert_eq!(radio.accepted()[0], vec!["XRP-1".to_string()]);

    scanner.allow("Rover-9").await;
    let seen = radio.accepted().len();
    assert!(eventually_within(PATIENCE, || radio.accepted().len() > seen + 1).await);
    assert_eq!(radio.accepted().last().unwrap(), &vec!["Rover-9".to_string()]);
    assert!(cached(&scanner, "Rover-9").await);

    scanner.disallow("Rover-9").await;
    let seen = radio.accepted().len();
    assert!(eventually_within(PATIENCE, || radio.accepted().len() > seen + 1).await);
    assert_eq!(radio.accepted().last().unwrap(), &vec!["XRP-1".to_string()]);

    stop_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_connect_consumes_cache_entry() {
    let radio = FakeRadio::new(&["XRP-1"]);
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let task = tokio::spawn(scanner.clone().run(stop));

    assert!(eventually_within(PATIENCE, || radio.scan_count() >= 1).await);
    stop_tx.send(true).unwrap();
    task.await.unwrap();

    let advertisement = scanner.get_device("XRP-1").await.unwrap().unwrap();
    assert_eq!(advertisement.address, "addr-XRP-1");

    scanner.connect(&advertisement).await.unwrap();
    assert_eq!(radio.connect_count(), 1);
    assert!(scanner.cached_names().await.is_empty());
    assert_eq!(scanner.get_device("XRP-1").await, Ok(None));
}

#[tokio::test(start_paused = true)]
async fn test_busy_radio_times_out_after_scan_window() {
    let radio = FakeRadio::new(&["XRP-1"]);
    radio.hang_scans();
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let task = tokio::spawn(scanner.clone().run(stop));

    assert!(eventually_within(PATIENCE, || radio.scan_count() == 1).await);

    let started = Instant::now();
    assert_eq!(scanner.get_device("XRP-1").await, Err(RadioError::Busy));
    assert!(started.elapsed() >= Duration::from_secs(1));

    let advertisement = Advertisement {
        name: "XRP-1".into(),
        address: "addr-XRP-1".into(),
        rssi: None,
    };
    assert!(matches!(scanner.connect(&advertisement).await, Err(RadioError::Busy)));
    assert_eq!(radio.connect_count(), 0);

    stop_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_missing_control_service_fails_without_retry() {
    let radio = FakeRadio::new(&["XRP-1"]);
    radio.without_control_service();
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let task = tokio::spawn(scanner.clone().run(stop));
    assert!(eventually_within(PATIENCE, || radio.scan_count() >= 1).await);

    let link = RadioLink::new("XRP-1".into(), scanner.clone());
    let mut connector = TransportConnector::new(Box::new(link), TransportKind::Radio, RetryPolicy::radio());
    let (_session_tx, mut session_stop) = stop_channel();

    assert_eq!(
        connector.connect(&mut session_stop).await,
        Err(TransportError::ServiceUnsupported("XRP-1".into()))
    );
    assert_eq!(connector.state(), ConnectionState::Failed);
    assert_eq!(radio.connect_count(), 1);
    assert_eq!(radio.log.disconnect_count(), 1);

    stop_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_undiscovered_peer_is_retried_until_advertised() {
    let radio = FakeRadio::new(&[]);
    let scanner = scanner(&radio);
    let (stop_tx, stop) = stop_channel();
    let scan_task = tokio::spawn(scanner.clone().run(stop));

    let link = RadioLink::new("XRP-1".into(), scanner.clone());
    let mut connector = TransportConnector::new(Box::new(link), TransportKind::Radio, RetryPolicy::radio());
    let mut states = connector.subscribe();
    let (_session_tx, mut session_stop) = stop_channel();
    let session = tokio::spawn(async move {
        let result = connector.connect(&mut session_stop).await;
        let sent = connector.send(b"EV:BA:1\n", &mut session_stop).await;
        (result, sent)
    });

    states.wait_for(|s| *s == ConnectionState::Reconnecting).await.unwrap();
    assert_eq!(radio.connect_count(), 0);
    radio.set_nearby(&["XRP-1"]);

    let (result, sent) = session.await.unwrap();
    assert!(result.is_ok());
    assert!(sent.is_ok());
    assert_eq!(radio.connect_count(), 1);
    assert_eq!(radio.log.frames(), vec!["EV:BA:1\n".to_string()]);

    stop_tx.send(true).unwrap();
    scan_task.await.unwrap();
}
