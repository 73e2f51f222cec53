use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::registry::EndpointRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Udp,
    Tcp,
    Radio,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Udp => write!(f, "udp"),
            TransportKind::Tcp => write!(f, "tcp"),
            TransportKind::Radio => write!(f, "radio"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(TransportKind::Udp),
            "tcp" => Ok(TransportKind::Tcp),
            "radio" | "ble" | "bluetooth" => Ok(TransportKind::Radio),
            other => Err(EndpointError::UnknownTransport(other.into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointAddress {
    /// Host name or IP plus port
    Inet { host: String, port: u16 },
    /// Advertised peripheral name
    Radio { name: String },
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointAddress::Inet { host, port } => write!(f, "{}:{}", host, port),
            EndpointAddress::Radio { name } => write!(f, "radio://{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Malformed endpoint description. Rejects one record, never a whole pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    MissingId,
    UnknownTransport(String),
    InvalidPort(String),
    MissingAddress(String),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "Endpoint record has no hardware id"),
            Self::UnknownTransport(t) => write!(f, "Unknown transport: {}", t),
            Self::InvalidPort(p) => write!(f, "Invalid port: {}", p),
            Self::MissingAddress(id) => write!(f, "Endpoint {} has no address", id),
        }
    }
}

impl std::error::Error for EndpointError {}

/// A controllable robot as tracked by the driver station.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    pub address: EndpointAddress,
    pub transport: TransportKind,
    /// State string as reported by the registry
    pub state: String,
}

impl Endpoint {
    /// True when `other` describes the same connection target. A change forces a rebind.
    pub fn same_target(&self, other: &Endpoint) -> bool {
        self.address == other.address && self.transport == other.transport && self.state == other.state
    }
}

impl TryFrom<&EndpointRecord> for Endpoint {
    type Error = EndpointError;

    fn try_from(record: &EndpointRecord) -> Result<Self, Self::Error> {
        let id = record.hardware_id.trim();
        if id.is_empty() {
            return Err(EndpointError::MissingId);
        }

        let transport: TransportKind = record.protocol.parse()?;

        let address = match transport {
            TransportKind::Radio => {
                let name = record
                    .ble_service
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(record.name.as_str());
                if name.is_empty() {
                    return Err(EndpointError::MissingAddress(id.into()));
                }
                EndpointAddress::Radio { name: name.into() }
            }
            TransportKind::Udp | TransportKind::Tcp => {
                let host = record.ip_address.trim();
                if host.is_empty() {
                    return Err(EndpointError::MissingAddress(id.into()));
                }
                let port = record
                    .port
                    .trim()
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| EndpointError::InvalidPort(record.port.clone()))?;
                EndpointAddress::Inet { host: host.into(), port }
            }
        };

        Ok(Self {
            id: EndpointId(id.into()),
            name: record.name.clone(),
            address,
            transport,
            state: record.state.to_ascii_lowercase(),
        })
    }
}
