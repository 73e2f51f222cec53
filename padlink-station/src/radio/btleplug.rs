use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;

use crate::errors::RadioError;

use super::{Advertisement, RadioAdapter, RadioConnection, UART_RX_CHARACTERISTIC, UART_SERVICE};

/// Largest write the default link MTU carries.
const WRITE_CHUNK: usize = 20;

pub struct BtleplugAdapter {
    adapter: Adapter,
}

impl BtleplugAdapter {
    /// Opens the first adapter the platform reports.
    pub async fn first() -> Result<Self, RadioError> {
        let manager = Manager::new().await.map_err(|e| RadioError::Adapter(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| RadioError::Adapter(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(RadioError::NoAdapter)?;

        Ok(Self { adapter })
    }
}

#[async_trait]
impl RadioAdapter for BtleplugAdapter {
    async fn scan(
        &self,
        window: Duration,
        min_rssi: i16,
        accept: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync),
    ) -> Result<Option<Advertisement>, RadioError> {
        let mut events = self
            .adapter
            .events()
            .await
            .map_err(|e| RadioError::Adapter(e.to_string()))?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| RadioError::Adapter(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + window;
        let found = loop {
            let id = match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id))) => id,
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break None,
            };

            let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                continue;
            };
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            let Some(name) = properties.local_name else {
                continue;
            };
            if properties.rssi.is_some_and(|rssi| rssi < min_rssi) {
                continue;
            }
            if accept(&name) {
                break Some(Advertisement {
                    name,
                    address: peripheral.address().to_string(),
                    rssi: properties.rssi,
                });
            }
        };

        if let Err(e) = self.adapter.stop_scan().await {
            tracing::debug!("Failed to stop scan: {}", e);
        }

        Ok(found)
    }

    async fn connect(&self, advertisement: &Advertisement) -> Result<Box<dyn RadioConnection>, RadioError> {
        let peripheral = self
            .adapter
            .peripherals()
            .await
            .map_err(|e| RadioError::Adapter(e.to_string()))?
            .into_iter()
            .find(|p| p.address().to_string() == advertisement.address)
            .ok_or_else(|| RadioError::Connect(format!("{} is no longer visible", advertisement.name)))?;

        peripheral
            .connect()
            .await
            .map_err(|e| RadioError::Connect(e.to_string()))?;
        peripheral
            .discover_services()
            .await
            .map_err(|e| RadioError::Connect(e.to_string()))?;

        let has_service = peripheral.services().iter().any(|s| s.uuid == UART_SERVICE);
        let rx = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == UART_RX_CHARACTERISTIC);

        Ok(Box::new(BtleplugConnection {
            peripheral,
            rx: rx.filter(|_| has_service),
        }))
    }
}

struct BtleplugConnection {
    peripheral: Peripheral,
    rx: Option<Characteristic>,
}

#[async_trait]
impl RadioConnection for BtleplugConnection {
    fn supports_control_service(&self) -> bool {
        self.rx.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), RadioError> {
        let Some(rx) = &self.rx else {
            return Err(RadioError::Write("control characteristic missing".into()));
        };
        for chunk in data.chunks(WRITE_CHUNK) {
            self.peripheral
                .write(rx, chunk, WriteType::WithoutResponse)
                .await
                .map_err(|e| RadioError::Write(e.to_string()))?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Err(e) = self.peripheral.disconnect().await {
            tracing::debug!("Radio disconnect failed: {}", e);
        }
    }
}
