//! Discovery of radio peripherals and serialized access to the radio.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use padlink_api::signal::{StopSignal, stopped};
use tokio::sync::{Mutex, RwLock};

use crate::configs::settings::Radio;
use crate::errors::RadioError;

#[cfg(feature = "radio")]
pub mod btleplug;

pub use padlink_api::protocol::radio::{UART_RX_CHARACTERISTIC, UART_SERVICE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub name: String,
    /// Adapter-specific peripheral address
    pub address: String,
    pub rssi: Option<i16>,
}

/// Radio stack. Only one operation may run at a time; [`RadioScanner`] enforces that.
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    /// Scans for up to `window` and returns the first accepted peripheral.
    async fn scan(
        &self,
        window: Duration,
        min_rssi: i16,
        accept: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync),
    ) -> Result<Option<Advertisement>, RadioError>;

    async fn connect(&self, advertisement: &Advertisement) -> Result<Box<dyn RadioConnection>, RadioError>;
}

#[async_trait]
pub trait RadioConnection: Send {
    /// Whether the peer exposes the control service.
    fn supports_control_service(&self) -> bool;

    async fn write(&mut self, data: &[u8]) -> Result<(), RadioError>;

    async fn disconnect(&mut self);
}

/// Name filter: explicit allow-list when non-empty, prefix otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub prefix: String,
    pub allow_list: Vec<String>,
}

impl ScanFilter {
    pub fn accepts(&self, name: &str) -> bool {
        if self.allow_list.is_empty() {
            !self.prefix.is_empty() && name.starts_with(&self.prefix)
        } else {
            self.allow_list.iter().any(|n| n == name)
        }
    }
}

pub struct RadioScanner {
    adapter: Arc<dyn RadioAdapter>,
    settings: Radio,
    /// Guards the radio itself as well as the cache
    cache: Mutex<HashMap<String, Advertisement>>,
    filter: RwLock<ScanFilter>,
}

impl RadioScanner {
    pub fn new(adapter: Arc<dyn RadioAdapter>, settings: Radio) -> Self {
        let filter = ScanFilter {
            prefix: settings.name_prefix.clone(),
            allow_list: settings.allow_list.clone(),
        };

        Self {
            adapter,
            settings,
            cache: Mutex::new(HashMap::new()),
            filter: RwLock::new(filter),
        }
    }

    fn scan_window(&self) -> Duration {
        Duration::from_secs(self.settings.scan_window_secs.max(1))
    }

    pub async fn allow(&self, name: &str) {
        let mut filter = self.filter.write().await;
        if !filter.allow_list.iter().any(|n| n == name) {
            filter.allow_list.push(name.into());
        }
    }

    pub async fn disallow(&self, name: &str) {
        self.filter.write().await.allow_list.retain(|n| n != name);
    }

    pub async fn filter(&self) -> ScanFilter {
        self.filter.read().await.clone()
    }

    /// Background scan loop. Runs until `stop` is raised.
    pub async fn run(self: Arc<Self>, mut stop: StopSignal) {
        tracing::info!("Radio scanner started");
        let rest = Duration::from_millis(self.settings.rest_ms);
        let backoff = Duration::from_secs(self.settings.error_backoff_secs);

        loop {
            let filter = self.filter().await;
            let accept = move |name: &str| filter.accepts(name);

            let pause = {
                let mut cache = tokio::select! {
                    _ = stopped(&mut stop) => break,
                    cache = self.cache.lock() => cache,
                };

                let result = tokio::select! {
                    _ = stopped(&mut stop) => break,
                    result = self.adapter.scan(self.scan_window(), self.settings.min_rssi, &accept) => result,
                };

                match result {
                    Ok(Some(advertisement)) => {
                        tracing::debug!(
                            "Discovered {} ({}) rssi {:?}",
                            advertisement.name,
                            advertisement.address,
                            advertisement.rssi
                        );
                        cache.insert(advertisement.name.clone(), advertisement);
                        rest
                    }
                    Ok(None) => rest,
                    Err(e) => {
                        tracing::warn!("Radio scan failed, backing off: {}", e);
                        backoff
                    }
                }
            };

            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("Radio scanner stopped");
    }

    /// Cached advertisement for `name`. Waits for a running scan to finish.
    pub async fn get_device(&self, name: &str) -> Result<Option<Advertisement>, RadioError> {
        let cache = tokio::time::timeout(self.scan_window(), self.cache.lock())
            .await
            .map_err(|_| RadioError::Busy)?;
        Ok(cache.get(name).cloned())
    }

    /// Connects to a cached peripheral, consuming its cache entry.
    pub async fn connect(&self, advertisement: &Advertisement) -> Result<Box<dyn RadioConnection>, RadioError> {
        let mut cache = tokio::time::timeout(self.scan_window(), self.cache.lock())
            .await
            .map_err(|_| RadioError::Busy)?;
        cache.remove(&advertisement.name);

        tokio::time::timeout(self.scan_window(), self.adapter.connect(advertisement))
            .await
            .map_err(|_| RadioError::Connect(format!("{} timed out", advertisement.name)))?
    }

    pub async fn cached_names(&self) -> Vec<String> {
        self.cache.lock().await.keys().cloned().collect()
    }
}
