use padlink_api::signal::{StopSignal, stopped};
use padlink_api::{Codec, ControlEvent, EndpointId};
use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::input::DeviceId;
use crate::transport::TransportConnector;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Stop was requested
    Stopped,
    /// The input side went away
    InputClosed,
    /// The transport gave up
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session: u64,
    pub endpoint: EndpointId,
    pub outcome: SessionOutcome,
}

/// Ferries one device's events to one endpoint, in order.
pub struct LinkSession {
    id: u64,
    device: DeviceId,
    endpoint: EndpointId,
    connector: TransportConnector,
    codec: Codec,
    events: mpsc::Receiver<ControlEvent>,
    reports: mpsc::UnboundedSender<SessionReport>,
    stop: StopSignal,
}

impl LinkSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        device: DeviceId,
        endpoint: EndpointId,
        connector: TransportConnector,
        codec: Codec,
        events: mpsc::Receiver<ControlEvent>,
        reports: mpsc::UnboundedSender<SessionReport>,
        stop: StopSignal,
    ) -> Self {
        Self {
            id,
            device,
            endpoint,
            connector,
            codec,
            events,
            reports,
            stop,
        }
    }

    pub async fn run(mut self) {
        let outcome = self.drive().await;
        self.connector.close().await;

        match &outcome {
            SessionOutcome::Failed(e) => {
                tracing::warn!("Session {} -> {} failed: {}", self.device, self.endpoint, e)
            }
            other => tracing::debug!("Session {} -> {} ended: {:?}", self.device, self.endpoint, other),
        }

        let _ = self.reports.send(SessionReport {
            session: self.id,
            endpoint: self.endpoint.clone(),
            outcome,
        });
    }

    async fn drive(&mut self) -> SessionOutcome {
        match self.connector.connect(&mut self.stop).await {
            Ok(()) => {}
            Err(TransportError::Cancelled) => return SessionOutcome::Stopped,
            Err(e) => return SessionOutcome::Failed(e),
        }
        tracing::info!("Session {} -> {} connected", self.device, self.endpoint);

        loop {
            let event = tokio::select! {
                _ = stopped(&mut self.stop) => return SessionOutcome::Stopped,
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                return SessionOutcome::InputClosed;
            };
            let Some(frame) = self.codec.encode(&event) else {
                continue;
            };

            let reconnects = self.connector.reconnects();
            match self.connector.send(frame.as_bytes(), &mut self.stop).await {
                Ok(()) => {
                    if self.connector.reconnects() != reconnects {
                        // The peer may have stopped while we were away; resend every axis.
                        self.codec.reset();
                    }
                    tracing::trace!("{} -> {}: {}", self.device, self.endpoint, frame);
                }
                Err(TransportError::Cancelled) => return SessionOutcome::Stopped,
                Err(e) => return SessionOutcome::Failed(e),
            }
        }
    }
}
