use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use padlink_api::models::{EndpointRecord, Registration, StatusReport};
use padlink_api::{EndpointFilter, EndpointRegistry, RegistryError};

/// Registry that refuses the first few registrations and records everything.
#[derive(Clone, Default)]
pub struct FakeRegistry {
    pub failing_registrations: Arc<Mutex<usize>>,
    pub attempts: Arc<Mutex<usize>>,
    pub registrations: Arc<Mutex<Vec<Registration>>>,
    pub statuses: Arc<Mutex<Vec<StatusReport>>>,
}

impl FakeRegistry {
    pub fn failing_first(count: usize) -> Self {
        let registry = Self::default();
        *registry.failing_registrations.lock().unwrap() = count;
        registry
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().iter().map(|s| s.status.clone()).collect()
    }
}

#[async_trait]
impl EndpointRegistry for FakeRegistry {
    async fn list_endpoints(&self, _filter: &EndpointFilter) -> Result<Vec<EndpointRecord>, RegistryError> {
        Ok(Vec::new())
    }

    async fn register_self(&self, registration: &Registration) -> Result<(), RegistryError> {
        *self.attempts.lock().unwrap() += 1;

        let mut failing = self.failing_registrations.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(RegistryError::Status(503));
        }

        self.registrations.lock().unwrap().push(registration.clone());
        Ok(())
    }

    async fn report_status(&self, report: &StatusReport) -> Result<(), RegistryError> {
        self.statuses.lock().unwrap().push(report.clone());
        Ok(())
    }
}
