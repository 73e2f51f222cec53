use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use padlink_api::signal::{StopSignal, stopped};
use padlink_api::{ConnectionState, Endpoint, EndpointAddress, TransportKind};
use tokio::sync::watch;

use crate::configs::settings::Settings;
use crate::errors::TransportError;
use crate::radio::RadioScanner;

pub mod radio;
pub mod retry;
pub mod tcp;
pub mod udp;

pub use radio::RadioLink;
pub use retry::{RetryDecision, RetryPolicy};
pub use tcp::TcpLink;
pub use udp::UdpLink;

/// One outbound byte channel to a robot.
#[async_trait]
pub trait Link: Send {
    /// Human-readable peer, used in logs and errors.
    fn target(&self) -> String;

    async fn open(&mut self) -> Result<(), TransportError>;

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    async fn receive(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Err(TransportError::NotConnected)
    }

    async fn close(&mut self);
}

/// Drives a [`Link`] through the connection state machine, applying the
/// transport's retry policy.
pub struct TransportConnector {
    link: Box<dyn Link>,
    transport: TransportKind,
    policy: RetryPolicy,
    state: watch::Sender<ConnectionState>,
    /// Consecutive failed opens since the link was last connected
    failures: u32,
    reconnects: u64,
}

impl TransportConnector {
    pub fn new(link: Box<dyn Link>, transport: TransportKind, policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            link,
            transport,
            policy,
            state,
            failures: 0,
            reconnects: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Number of times the link was re-established after a failure.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    fn set_state(&self, next: ConnectionState) {
        let mut previous = next;
        let changed = self.state.send_if_modified(|state| {
            previous = *state;
            *state = next;
            previous != next
        });
        if changed {
            tracing::info!("{} link {}: {} -> {}", self.transport, self.link.target(), previous, next);
        }
    }

    /// Opens the link, retrying per policy until it succeeds, the policy
    /// gives up, or `stop` is raised.
    pub async fn connect(&mut self, stop: &mut StopSignal) -> Result<(), TransportError> {
        self.failures = 0;
        // Binding a UDP socket has nothing to wait for.
        if self.transport != TransportKind::Udp {
            self.set_state(ConnectionState::Connecting);
        }
        self.establish(stop, None).await
    }

    async fn establish(
        &mut self,
        stop: &mut StopSignal,
        mut failure: Option<TransportError>,
    ) -> Result<(), TransportError> {
        loop {
            if let Some(error) = failure.take() {
                self.failures += 1;
                match self.policy.decide(&error, self.failures) {
                    RetryDecision::GiveUp => {
                        tracing::warn!("Giving up on {}: {}", self.link.target(), error);
                        self.set_state(ConnectionState::Failed);
                        return Err(error);
                    }
                    RetryDecision::Retry(delay) => {
                        self.set_state(ConnectionState::Reconnecting);
                        tracing::debug!(
                            "Retrying {} in {:?} after failure {}: {}",
                            self.link.target(),
                            delay,
                            self.failures,
                            error
                        );
                        if !delay.is_zero() {
                            let cancelled = tokio::select! {
                                _ = stopped(stop) => true,
                                _ = tokio::time::sleep(delay) => false,
                            };
                            if cancelled {
                                self.set_state(ConnectionState::Disconnected);
                                return Err(TransportError::Cancelled);
                            }
                        }
                    }
                }
            }

            let result = tokio::select! {
                _ = stopped(stop) => Err(TransportError::Cancelled),
                result = self.link.open() => result,
            };

            match result {
                Ok(()) => {
                    if self.failures > 0 {
                        self.reconnects += 1;
                    }
                    self.failures = 0;
                    self.set_state(ConnectionState::Connected);
                    return Ok(());
                }
                Err(TransportError::Cancelled) => {
                    self.link.close().await;
                    self.set_state(ConnectionState::Disconnected);
                    return Err(TransportError::Cancelled);
                }
                Err(error) => {
                    self.link.close().await;
                    failure = Some(error);
                }
            }
        }
    }

    /// Writes `bytes`, transparently reconnecting and resending after a
    /// link failure the policy allows to recover. A frame that keeps failing
    /// on fresh links is given up after the policy's attempt cap.
    pub async fn send(&mut self, bytes: &[u8], stop: &mut StopSignal) -> Result<(), TransportError> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        let mut resends = 0;
        loop {
            let result = tokio::select! {
                _ = stopped(stop) => Err(TransportError::Cancelled),
                result = self.link.send(bytes) => result,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(TransportError::Cancelled) => return Err(TransportError::Cancelled),
                Err(error) => {
                    tracing::info!("Send to {} failed: {}", self.link.target(), error);
                    self.link.close().await;

                    resends += 1;
                    if self.policy.decide(&error, resends) == RetryDecision::GiveUp {
                        tracing::warn!("Giving up on {}: {}", self.link.target(), error);
                        self.set_state(ConnectionState::Failed);
                        return Err(error);
                    }
                    self.establish(stop, Some(error)).await?;
                }
            }
        }
    }

    pub async fn receive(&mut self, buf: &mut [u8], stop: &mut StopSignal) -> Result<usize, TransportError> {
        tokio::select! {
            _ = stopped(stop) => Err(TransportError::Cancelled),
            result = self.link.receive(buf) => result,
        }
    }

    pub async fn close(&mut self) {
        self.link.close().await;
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Builds connectors for endpoints. Swapped out in tests.
pub trait LinkFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint) -> Result<TransportConnector, TransportError>;
}

pub struct DefaultLinkFactory {
    tcp_connect_timeout: Duration,
    udp_policy: RetryPolicy,
    tcp_policy: RetryPolicy,
    radio_policy: RetryPolicy,
    scanner: Option<Arc<RadioScanner>>,
}

impl DefaultLinkFactory {
    pub fn new(settings: &Settings, scanner: Option<Arc<RadioScanner>>) -> Self {
        Self {
            tcp_connect_timeout: Duration::from_millis(settings.tcp.connect_timeout_ms),
            udp_policy: settings.retry.udp,
            tcp_policy: settings.retry.tcp,
            radio_policy: settings.retry.radio,
            scanner,
        }
    }
}

impl LinkFactory for DefaultLinkFactory {
    fn create(&self, endpoint: &Endpoint) -> Result<TransportConnector, TransportError> {
        let connector = match (&endpoint.address, endpoint.transport) {
            (EndpointAddress::Inet { host, port }, TransportKind::Udp) => TransportConnector::new(
                Box::new(UdpLink::new(host.clone(), *port)),
                TransportKind::Udp,
                self.udp_policy,
            ),
            (EndpointAddress::Inet { host, port }, TransportKind::Tcp) => TransportConnector::new(
                Box::new(TcpLink::new(host.clone(), *port, self.tcp_connect_timeout)),
                TransportKind::Tcp,
                self.tcp_policy,
            ),
            (EndpointAddress::Radio { name }, TransportKind::Radio) => {
                let scanner = self
                    .scanner
                    .clone()
                    .ok_or_else(|| TransportError::Configuration("radio is disabled".into()))?;
                TransportConnector::new(
                    Box::new(RadioLink::new(name.clone(), scanner)),
                    TransportKind::Radio,
                    self.radio_policy,
                )
            }
            (address, transport) => {
                return Err(TransportError::Configuration(format!(
                    "{} cannot be reached over {}",
                    address, transport
                )));
            }
        };

        Ok(connector)
    }
}
