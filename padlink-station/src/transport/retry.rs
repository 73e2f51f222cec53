use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorClass, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

/// Per-transport reconnect rules, consumed by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// A refusing host is reported instead of retried
    pub fail_on_refused: bool,
    /// Delay after an unreachable peer
    pub delay_ms: u64,
    /// None retries forever
    pub max_unreachable_attempts: Option<u32>,
    /// Delay after a dropped link, usually zero
    pub transient_delay_ms: u64,
    pub max_transient_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn tcp() -> Self {
        Self {
            fail_on_refused: true,
            delay_ms: 5000,
            max_unreachable_attempts: None,
            transient_delay_ms: 0,
            max_transient_attempts: Some(3),
        }
    }

    /// Sockets are re-created on every error and never give up.
    pub fn udp() -> Self {
        Self {
            fail_on_refused: false,
            delay_ms: 1000,
            max_unreachable_attempts: None,
            transient_delay_ms: 0,
            max_transient_attempts: None,
        }
    }

    pub fn radio() -> Self {
        Self {
            fail_on_refused: true,
            delay_ms: 2000,
            max_unreachable_attempts: None,
            transient_delay_ms: 1000,
            max_transient_attempts: Some(5),
        }
    }

    /// `attempt` counts consecutive failures, starting at 1.
    pub fn decide(&self, error: &TransportError, attempt: u32) -> RetryDecision {
        let within = |max: Option<u32>| max.is_none_or(|max| attempt <= max);

        match error.class() {
            ErrorClass::Refused if self.fail_on_refused => RetryDecision::GiveUp,
            ErrorClass::Refused | ErrorClass::Unreachable => {
                if within(self.max_unreachable_attempts) {
                    RetryDecision::Retry(Duration::from_millis(self.delay_ms))
                } else {
                    RetryDecision::GiveUp
                }
            }
            ErrorClass::TransientNetwork => {
                if within(self.max_transient_attempts) {
                    RetryDecision::Retry(Duration::from_millis(self.transient_delay_ms))
                } else {
                    RetryDecision::GiveUp
                }
            }
            ErrorClass::ProtocolIncompatibility | ErrorClass::Configuration | ErrorClass::Cancelled => {
                RetryDecision::GiveUp
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::tcp()
    }
}
