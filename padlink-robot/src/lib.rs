use std::sync::Arc;
use std::time::Duration;

use padlink_api::signal::stop_channel;
use padlink_api::{EndpointRegistry, HttpRegistry};
use uuid::Uuid;

use crate::configs::settings::Settings;
use crate::error::RuntimeError;
use crate::hardware::SimulatedChassis;
use crate::runtime::{Listener, RobotRuntime};

pub mod configs;
pub mod control;
pub mod error;
pub mod hardware;
pub mod runtime;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(settings: &Arc<Settings>) {
    let (stop_tx, stop_rx) = stop_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = stop_tx.send(true);
        }
    });

    if let Err(e) = validate(settings) {
        tracing::error!("{}", e);
        return;
    }

    let robot_id = settings
        .robot
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let listener = match Listener::open(settings, &robot_id).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };

    let runtime = RobotRuntime::new(
        settings,
        robot_id,
        SimulatedChassis::new(settings.servos.count),
        create_registry(settings),
    );

    runtime.run(listener, stop_rx).await;
}

pub fn validate(settings: &Settings) -> Result<(), RuntimeError> {
    let servos = &settings.servos;
    if servos.max_angle < servos.min_angle {
        return Err(RuntimeError::Settings(format!(
            "servo max_angle {} is below min_angle {}",
            servos.max_angle, servos.min_angle
        )));
    }
    Ok(())
}

fn create_registry(settings: &Settings) -> Option<Arc<dyn EndpointRegistry>> {
    let urls = settings.enabled_registries();
    if urls.is_empty() {
        return None;
    }

    match HttpRegistry::new(urls, REGISTRY_TIMEOUT) {
        Ok(registry) => Some(Arc::new(registry)),
        Err(e) => {
            tracing::error!("Failed to create registry client: {}", e);
            None
        }
    }
}
