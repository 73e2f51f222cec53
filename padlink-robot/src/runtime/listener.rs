use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use padlink_api::protocol::split_datagram;
use padlink_api::signal::{StopSignal, stopped};
use padlink_api::{Command, FrameReassembler, TransportKind};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::{sleep, timeout};

use crate::configs::settings::{self, Settings};
use crate::control::LinkStatus;
use crate::error::RuntimeError;
use crate::hardware::Chassis;

#[cfg(feature = "radio")]
use super::radio::RadioAcceptor;
use super::{RobotRuntime, radio_name};

const READ_BUFFER_SIZE: usize = 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound inbound socket or advertised service the controller talks to.
#[derive(Debug)]
pub enum Listener {
    Udp(UdpSocket),
    Tcp(TcpListener),
    #[cfg(feature = "radio")]
    Radio(RadioAcceptor),
}

impl Listener {
    /// Opens the configured listener for robot `id`. Radio advertises under the robot's radio name.
    pub async fn open(settings: &Settings, id: &str) -> Result<Self, RuntimeError> {
        if settings.listener.transport != TransportKind::Radio {
            return Self::bind(&settings.listener).await;
        }
        Self::advertise(&radio_name(settings, id)).await
    }

    #[cfg(feature = "radio")]
    async fn advertise(name: &str) -> Result<Self, RuntimeError> {
        RadioAcceptor::advertise(name).await.map(Listener::Radio)
    }

    #[cfg(not(feature = "radio"))]
    async fn advertise(name: &str) -> Result<Self, RuntimeError> {
        tracing::warn!("Cannot advertise {}: built without the radio feature", name);
        Err(RuntimeError::UnsupportedListener(TransportKind::Radio))
    }

    /// Binds a socket listener. Radio has no socket; use [`Listener::open`].
    pub async fn bind(settings: &settings::Listener) -> Result<Self, RuntimeError> {
        let address = format!("{}:{}", settings.host, settings.port);
        let bind_error = |source: io::Error| RuntimeError::Bind {
            transport: settings.transport,
            address: address.clone(),
            source,
        };

        match settings.transport {
            TransportKind::Udp => UdpSocket::bind(&address).await.map(Listener::Udp).map_err(bind_error),
            TransportKind::Tcp => TcpListener::bind(&address).await.map(Listener::Tcp).map_err(bind_error),
            TransportKind::Radio => Err(RuntimeError::UnsupportedListener(TransportKind::Radio)),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Listener::Udp(socket) => socket.local_addr(),
            Listener::Tcp(listener) => listener.local_addr(),
            #[cfg(feature = "radio")]
            Listener::Radio(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "radio listener has no socket")),
        }
    }
}

/// Source of connection-oriented byte streams, one controller at a time.
///
/// Implemented by TCP and, with the `radio` feature, the BLE peripheral service.
#[allow(async_fn_in_trait)]
pub trait StreamAcceptor {
    type Stream: AsyncRead + Unpin;

    /// Waits for the next controller and names its peer.
    async fn accept_stream(&mut self) -> io::Result<(Self::Stream, String)>;
}

impl StreamAcceptor for TcpListener {
    type Stream = TcpStream;

    async fn accept_stream(&mut self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = self.accept().await?;
        Ok((stream, peer.to_string()))
    }
}

impl<C: Chassis> RobotRuntime<C> {
    pub(super) async fn listen(&self, listener: Listener, mut stop: StopSignal) {
        match listener {
            Listener::Udp(socket) => {
                tokio::select! {
                    _ = stopped(&mut stop) => {}
                    _ = self.serve_datagrams(&socket) => {}
                }
            }
            Listener::Tcp(mut listener) => {
                tokio::select! {
                    _ = stopped(&mut stop) => {}
                    _ = self.serve_streams(&mut listener) => {}
                }
            }
            #[cfg(feature = "radio")]
            Listener::Radio(mut acceptor) => {
                tokio::select! {
                    _ = stopped(&mut stop) => {}
                    _ = self.serve_streams(&mut acceptor) => {}
                }
            }
        }
    }

    /// Serves one stream after another until dropped.
    pub async fn serve_streams<A: StreamAcceptor>(&self, acceptor: &mut A) {
        loop {
            self.set_status(LinkStatus::WaitingForConnection);
            match acceptor.accept_stream().await {
                Ok((stream, peer)) => self.serve_stream(stream, &peer).await,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    async fn serve_stream<S: AsyncRead + Unpin>(&self, mut stream: S, peer: &str) {
        tracing::info!("Controller connected from {}", peer);
        self.set_status(LinkStatus::Connected);

        let mut reassembler = FrameReassembler::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            match timeout(self.read_timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    tracing::info!("Controller {} closed the connection", peer);
                    break;
                }
                Ok(Ok(n)) => {
                    for frame in reassembler.feed(&buf[..n]) {
                        self.process_frame(&frame);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("Connection to {} failed: {}", peer, e);
                    break;
                }
                Err(_) => self.process_command(Command::ReadTimeout),
            }
        }

        self.stop_movement();
        self.set_status(LinkStatus::Disconnected);
    }

    async fn serve_datagrams(&self, socket: &UdpSocket) {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut peer = None;

        loop {
            match timeout(self.read_timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((n, from))) => {
                    if peer != Some(from) {
                        tracing::info!("Receiving commands from {}", from);
                        peer = Some(from);
                        self.set_status(LinkStatus::Connected);
                    }
                    for frame in split_datagram(&buf[..n]) {
                        self.process_frame(frame);
                    }
                }
                Ok(Err(e)) => {
                    tracing::debug!("Datagram receive failed: {}", e);
                    self.process_command(Command::ReadTimeout);
                }
                Err(_) => self.process_command(Command::ReadTimeout),
            }
        }
    }
}
