#![allow(dead_code)]

pub mod fake_registry;

use std::time::Duration;

use padlink_api::TransportKind;
use padlink_robot::configs::settings::Settings;

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Settings for a robot listening on an ephemeral loopback port.
pub fn loopback_settings(transport: TransportKind, read_timeout_ms: u64) -> Settings {
    let mut settings = Settings::default();
    settings.listener.transport = transport;
    settings.listener.host = "127.0.0.1".into();
    settings.listener.port = 0;
    settings.listener.read_timeout_ms = read_timeout_ms;
    settings
}
