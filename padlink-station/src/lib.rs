use std::sync::Arc;
use std::time::Duration;

use padlink_api::signal::{StopSignal, stop_channel};
use padlink_api::{EndpointRegistry, HttpRegistry, StaticRegistry};
use uuid::Uuid;

use crate::configs::settings::Settings;
use crate::input::{InputDeviceRegistry, backend_or_null};
use crate::radio::{RadioAdapter, RadioScanner};
use crate::services::{Orchestrator, StationIdentity};
use crate::transport::DefaultLinkFactory;

pub mod configs;
pub mod errors;
pub mod input;
pub mod radio;
pub mod services;
pub mod transport;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(settings: &Arc<Settings>) {
    let (stop_tx, stop_rx) = stop_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = stop_tx.send(true);
        }
    });

    let station_id = settings
        .station
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let mut alliance = settings.station.alliance.clone();
    let registry: Arc<dyn EndpointRegistry> = match create_http_registry(settings) {
        Some(http) => {
            if alliance.is_none() {
                alliance = lookup_alliance(&http, &station_id).await;
            }
            Arc::new(http)
        }
        None => {
            tracing::info!("Using {} configured endpoints", settings.static_records().len());
            Arc::new(StaticRegistry::new(settings.static_records()))
        }
    };

    let scanner = start_radio(settings, stop_rx.clone()).await;

    let backend = backend_or_null(settings.input.backend);

    let identity = StationIdentity {
        id: station_id,
        name: settings.station.name.clone(),
        alliance,
        endpoint_type: settings.station.endpoint_type.clone(),
    };

    let orchestrator = Orchestrator::new(
        settings,
        identity,
        registry,
        InputDeviceRegistry::new(backend),
        Arc::new(DefaultLinkFactory::new(settings, scanner.clone())),
        scanner,
    );

    orchestrator.run(stop_rx).await;
}

fn create_http_registry(settings: &Settings) -> Option<HttpRegistry> {
    let urls = settings.enabled_registries();
    if urls.is_empty() {
        return None;
    }

    match HttpRegistry::new(urls, REGISTRY_TIMEOUT) {
        Ok(registry) => Some(registry),
        Err(e) => {
            tracing::error!("Failed to create registry client: {}", e);
            None
        }
    }
}

async fn lookup_alliance(registry: &HttpRegistry, station_id: &str) -> Option<String> {
    match registry.lookup(station_id).await {
        Ok(record) => record.and_then(|r| r.alliance),
        Err(e) => {
            tracing::debug!("Alliance lookup failed: {}", e);
            None
        }
    }
}

async fn start_radio(settings: &Settings, stop: StopSignal) -> Option<Arc<RadioScanner>> {
    if !settings.radio.enabled {
        return None;
    }

    let adapter = create_radio_adapter().await?;
    let scanner = Arc::new(RadioScanner::new(adapter, settings.radio.clone()));
    tokio::spawn(scanner.clone().run(stop));
    Some(scanner)
}

#[cfg(feature = "radio")]
async fn create_radio_adapter() -> Option<Arc<dyn RadioAdapter>> {
    match radio::btleplug::BtleplugAdapter::first().await {
        Ok(adapter) => Some(Arc::new(adapter)),
        Err(e) => {
            tracing::error!("Radio unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "radio"))]
async fn create_radio_adapter() -> Option<Arc<dyn RadioAdapter>> {
    tracing::warn!("Radio endpoints configured but radio support is not compiled in");
    None
}
