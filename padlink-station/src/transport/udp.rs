use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::{UdpSocket, lookup_host};

use crate::errors::TransportError;

use super::Link;

/// Connectionless link. "Opening" resolves the peer and binds a local socket.
pub struct UdpLink {
    host: String,
    port: u16,
    remote: Option<SocketAddr>,
    socket: Option<UdpSocket>,
}

impl UdpLink {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            remote: None,
            socket: None,
        }
    }
}

#[async_trait]
impl Link for UdpLink {
    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let remote = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| TransportError::from_io(self.target(), &e))?
            .next()
            .ok_or_else(|| TransportError::Unreachable {
                target: self.target(),
                reason: "host did not resolve".into(),
            })?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::from_io(self.target(), &e))?;

        self.remote = Some(remote);
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let (Some(socket), Some(remote)) = (&self.socket, self.remote) else {
            return Err(TransportError::NotConnected);
        };

        // Any error here is ICMP-derived; the socket gets recreated.
        socket
            .send_to(bytes, remote)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Transient {
                target: self.target(),
                reason: e.to_string(),
            })
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(socket) = &self.socket else {
            return Err(TransportError::NotConnected);
        };
        let (n, _) = socket.recv_from(buf).await.map_err(|e| TransportError::Transient {
            target: self.target(),
            reason: e.to_string(),
        })?;
        Ok(n)
    }

    async fn close(&mut self) {
        self.socket = None;
    }
}
