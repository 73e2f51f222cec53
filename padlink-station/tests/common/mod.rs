#![allow(dead_code)]

pub mod fake_input;
pub mod fake_link;
pub mod fake_radio;
pub mod fake_registry;

use std::time::Duration;

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F: FnMut() -> bool>(condition: F) -> bool {
    eventually_within(Duration::from_secs(2), condition).await
}

pub async fn eventually_within<F: FnMut() -> bool>(limit: Duration, mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
