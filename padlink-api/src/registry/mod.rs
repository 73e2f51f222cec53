//! Client side of the field-management registry.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use async_trait::async_trait;

use crate::models::{EndpointRecord, Registration, StatusReport};

pub mod http;
pub mod static_list;

pub use http::HttpRegistry;
pub use static_list::StaticRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    /// Device category, e.g. "XRP"
    pub device_type: Option<String>,
    /// Restrict to one alliance
    pub alliance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Request could not be sent or the connection failed
    Http(String),
    /// Registry answered with a non-success status
    Status(u16),
    /// Response body did not match the expected shape
    Decode(String),
    /// No registry base URL configured
    NotConfigured,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Registry request failed: {}", e),
            Self::Status(code) => write!(f, "Registry returned status {}", code),
            Self::Decode(e) => write!(f, "Registry response malformed: {}", e),
            Self::NotConfigured => write!(f, "No registry configured"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

#[async_trait]
pub trait EndpointRegistry: Send + Sync {
    async fn list_endpoints(&self, filter: &EndpointFilter) -> Result<Vec<EndpointRecord>, RegistryError>;

    async fn register_self(&self, registration: &Registration) -> Result<(), RegistryError>;

    async fn report_status(&self, report: &StatusReport) -> Result<(), RegistryError>;
}

/// Address of the interface that routes to the outside world. No packet is sent.
pub fn local_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(RegistryError::Status(404).to_string(), "Registry returned status 404");
        assert_eq!(RegistryError::NotConfigured.to_string(), "No registry configured");
    }
}
