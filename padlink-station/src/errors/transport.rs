use std::io;

use super::RadioError;

/// How a failure is treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Established link dropped; reconnect at once
    TransientNetwork,
    /// Peer not there (yet); retry after a delay
    Unreachable,
    /// Host up but rejecting connections
    Refused,
    /// Peer lacks the control service; never retried
    ProtocolIncompatibility,
    /// Endpoint description unusable; never retried
    Configuration,
    /// Session was told to stop
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection refused by {0}")]
    Refused(String),

    #[error("{target} not reachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("Link to {target} dropped: {reason}")]
    Transient { target: String, reason: String },

    #[error("{0} does not expose the control service")]
    ServiceUnsupported(String),

    #[error("{0} not discovered")]
    NotDiscovered(String),

    #[error(transparent)]
    Radio(#[from] RadioError),

    #[error("Link not connected")]
    NotConnected,

    #[error("Invalid endpoint: {0}")]
    Configuration(String),

    #[error("Cancelled")]
    Cancelled,
}

impl TransportError {
    /// Classifies a socket error against `target`.
    pub fn from_io(target: impl Into<String>, e: &io::Error) -> Self {
        let target = target.into();
        match e.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused(target),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => Self::Transient {
                target,
                reason: e.to_string(),
            },
            _ => Self::Unreachable {
                target,
                reason: e.to_string(),
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Refused(_) => ErrorClass::Refused,
            Self::Unreachable { .. } | Self::NotDiscovered(_) => ErrorClass::Unreachable,
            Self::Transient { .. } | Self::Radio(_) | Self::NotConnected => ErrorClass::TransientNetwork,
            Self::ServiceUnsupported(_) => ErrorClass::ProtocolIncompatibility,
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::Cancelled => ErrorClass::Cancelled,
        }
    }
}
