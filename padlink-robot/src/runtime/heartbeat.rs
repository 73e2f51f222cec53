use padlink_api::models::{Registration, StatusReport};
use padlink_api::registry::local_ip;
use padlink_api::signal::{StopSignal, stopped};
use padlink_api::{EndpointRegistry, TransportKind};
use tokio::time::interval;

use crate::hardware::Chassis;

use super::RobotRuntime;

impl<C: Chassis> RobotRuntime<C> {
    /// Registers with the registry, then reports link status every interval.
    pub(super) async fn heartbeat(&self, mut stop: StopSignal) {
        let Some(registry) = self.registry.clone() else {
            tracing::debug!("No registry configured, heartbeat idle");
            stopped(&mut stop).await;
            return;
        };

        let mut ticker = interval(self.heartbeat_interval);
        let mut registered = false;

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = ticker.tick() => {
                    registered = self.beat(registry.as_ref(), registered).await;
                }
            }
        }
    }

    /// One heartbeat. Returns whether the robot is registered afterwards.
    async fn beat(&self, registry: &dyn EndpointRegistry, registered: bool) -> bool {
        if !registered {
            match registry.register_self(&self.registration()).await {
                Ok(()) => tracing::info!("Registered {} as {}", self.identity.id, self.identity.name),
                Err(e) => {
                    tracing::warn!("Failed to register with the registry: {}", e);
                    return false;
                }
            }
        }

        let report = StatusReport {
            hardware_id: self.identity.id.clone(),
            status: self.status().to_string(),
        };
        if let Err(e) = registry.report_status(&report).await {
            tracing::warn!("Failed to report status: {}", e);
        }
        true
    }

    pub fn registration(&self) -> Registration {
        let identity = &self.identity;
        Registration {
            hardware_id: identity.id.clone(),
            device_type: identity.device_type.clone(),
            name: identity.name.clone(),
            ip_address: local_ip().to_string(),
            port: identity.port.to_string(),
            protocol: match identity.transport {
                TransportKind::Udp => "UDP",
                TransportKind::Tcp => "TCP",
                TransportKind::Radio => "BLUETOOTH",
            }
            .into(),
            application: identity.application.clone(),
            version: env!("CARGO_PKG_VERSION").into(),
            status: self.status().to_string(),
            ble_service: Some(identity.radio_name.clone()),
        }
    }
}
