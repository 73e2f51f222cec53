use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use padlink_api::models::{EndpointRecord, Registration, StatusReport};
use padlink_api::{EndpointFilter, EndpointRegistry, RegistryError};

/// Registry whose listing is set by the test.
#[derive(Clone, Default)]
pub struct FakeRegistry {
    pub records: Arc<Mutex<Vec<EndpointRecord>>>,
    pub registrations: Arc<Mutex<Vec<Registration>>>,
    pub statuses: Arc<Mutex<Vec<StatusReport>>>,
}

impl FakeRegistry {
    pub fn set(&self, records: Vec<EndpointRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

pub fn udp_record(id: &str, host: &str) -> EndpointRecord {
    EndpointRecord {
        hardware_id: id.into(),
        name: id.into(),
        device_type: "XRP".into(),
        ip_address: host.into(),
        port: "9999".into(),
        protocol: "udp".into(),
        state: "registered".into(),
        ..Default::default()
    }
}

#[async_trait]
impl EndpointRegistry for FakeRegistry {
    async fn list_endpoints(&self, _filter: &EndpointFilter) -> Result<Vec<EndpointRecord>, RegistryError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn register_self(&self, registration: &Registration) -> Result<(), RegistryError> {
        self.registrations.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn report_status(&self, report: &StatusReport) -> Result<(), RegistryError> {
        self.statuses.lock().unwrap().push(report.clone());
        Ok(())
    }
}
