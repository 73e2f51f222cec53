use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::radio::{RadioConnection, RadioScanner};

use super::Link;

/// Link over the peripheral's serial-style control characteristic.
pub struct RadioLink {
    name: String,
    scanner: Arc<RadioScanner>,
    connection: Option<Box<dyn RadioConnection>>,
}

impl RadioLink {
    pub fn new(name: String, scanner: Arc<RadioScanner>) -> Self {
        Self {
            name,
            scanner,
            connection: None,
        }
    }
}

#[async_trait]
impl Link for RadioLink {
    fn target(&self) -> String {
        self.name.clone()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let Some(advertisement) = self.scanner.get_device(&self.name).await? else {
            return Err(TransportError::NotDiscovered(self.name.clone()));
        };

        let mut connection = self.scanner.connect(&advertisement).await?;
        if !connection.supports_control_service() {
            connection.disconnect().await;
            return Err(TransportError::ServiceUnsupported(self.name.clone()));
        }

        self.connection = Some(connection);
        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        connection.write(bytes).await.map_err(TransportError::from)
    }

    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.disconnect().await;
        }
    }
}
