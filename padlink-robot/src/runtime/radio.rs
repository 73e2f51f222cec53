//! BLE peripheral listener: advertises the control service and accepts the
//! station's write stream on the RX characteristic.

use std::fmt;
use std::io;
use std::pin::Pin;

use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::CharacteristicReader;
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicControl, CharacteristicControlEvent,
    CharacteristicControlHandle, CharacteristicWrite, CharacteristicWriteMethod, Service, characteristic_control,
};
use futures::StreamExt;
use padlink_api::protocol::radio::{UART_RX_CHARACTERISTIC, UART_SERVICE};

use crate::error::RuntimeError;

use super::StreamAcceptor;

pub struct RadioAcceptor {
    name: String,
    control: Pin<Box<CharacteristicControl>>,
    // Dropping either handle withdraws the service.
    _advertisement: AdvertisementHandle,
    _application: ApplicationHandle,
    _session: bluer::Session,
}

impl fmt::Debug for RadioAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioAcceptor").field("name", &self.name).finish()
    }
}

impl RadioAcceptor {
    /// Powers the default adapter, registers the control service and starts advertising `name`.
    pub async fn advertise(name: &str) -> Result<Self, RuntimeError> {
        let radio_error = |e: bluer::Error| RuntimeError::Radio(e.to_string());

        let session = bluer::Session::new().await.map_err(radio_error)?;
        let adapter = session.default_adapter().await.map_err(radio_error)?;
        adapter.set_powered(true).await.map_err(radio_error)?;

        let (control, handle) = characteristic_control();
        let application = adapter
            .serve_gatt_application(control_application(handle))
            .await
            .map_err(radio_error)?;
        let advertisement = adapter.advertise(advertisement(name)).await.map_err(radio_error)?;

        tracing::info!("Advertising {} on adapter {}", name, adapter.name());
        Ok(Self {
            name: name.into(),
            control: Box::pin(control),
            _advertisement: advertisement,
            _application: application,
            _session: session,
        })
    }
}

impl StreamAcceptor for RadioAcceptor {
    type Stream = Pin<Box<CharacteristicReader>>;

    async fn accept_stream(&mut self) -> io::Result<(Self::Stream, String)> {
        loop {
            match self.control.next().await {
                Some(CharacteristicControlEvent::Write(request)) => {
                    let reader = request.accept().map_err(io::Error::other)?;
                    let peer = reader.device_address().to_string();
                    return Ok((Box::pin(reader), peer));
                }
                Some(CharacteristicControlEvent::Notify(_)) => {
                    tracing::debug!("Ignoring notify subscription on {}", self.name);
                }
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        format!("control service for {} was unregistered", self.name),
                    ));
                }
            }
        }
    }
}

/// GATT application with the control service and its write-only RX characteristic.
fn control_application(handle: CharacteristicControlHandle) -> Application {
    Application {
        services: vec![Service {
            uuid: UART_SERVICE,
            primary: true,
            characteristics: vec![Characteristic {
                uuid: UART_RX_CHARACTERISTIC,
                write: Some(CharacteristicWrite {
                    write: true,
                    write_without_response: true,
                    method: CharacteristicWriteMethod::Io,
                    ..Default::default()
                }),
                control_handle: handle,
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn advertisement(name: &str) -> Advertisement {
    Advertisement {
        service_uuids: [UART_SERVICE].into_iter().collect(),
        discoverable: Some(true),
        local_name: Some(name.into()),
        ..Default::default()
    }
}
