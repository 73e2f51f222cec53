use async_trait::async_trait;

use crate::models::{EndpointRecord, Registration, StatusReport};

use super::{EndpointFilter, EndpointRegistry, RegistryError};

/// Fixed endpoint list taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    records: Vec<EndpointRecord>,
}

impl StaticRegistry {
    pub fn new(records: Vec<EndpointRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl EndpointRegistry for StaticRegistry {
    async fn list_endpoints(&self, filter: &EndpointFilter) -> Result<Vec<EndpointRecord>, RegistryError> {
        Ok(self
            .records
            .iter()
            // Records without an alliance belong to everyone.
            .filter(|r| match (&filter.alliance, &r.alliance) {
                (Some(wanted), Some(alliance)) => wanted == alliance,
                _ => true,
            })
            .cloned()
            .collect())
    }

    async fn register_self(&self, registration: &Registration) -> Result<(), RegistryError> {
        tracing::debug!("Static registry ignores registration of {}", registration.hardware_id);
        Ok(())
    }

    async fn report_status(&self, report: &StatusReport) -> Result<(), RegistryError> {
        tracing::debug!("Status of {}: {}", report.hardware_id, report.status);
        Ok(())
    }
}
