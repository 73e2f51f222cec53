use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::errors::TransportError;

use super::Link;

pub struct TcpLink {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpLink {
    pub fn new(host: String, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host,
            port,
            connect_timeout,
            stream: None,
        }
    }

    fn dropped(&self, reason: impl Into<String>) -> TransportError {
        TransportError::Transient {
            target: self.target(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Link for TcpLink {
    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::from_io(self.target(), &e)),
            Err(_) => {
                return Err(TransportError::Unreachable {
                    target: self.target(),
                    reason: "connect timed out".into(),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to disable Nagle on {}: {}", self.target(), e);
        }
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        // Any failure on an established stream counts as a dropped link.
        match stream.write_all(bytes).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.dropped(e.to_string())),
        }
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match stream.read(buf).await {
            Ok(0) => Err(self.dropped("closed by peer")),
            Ok(n) => Ok(n),
            Err(e) => Err(self.dropped(e.to_string())),
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}
