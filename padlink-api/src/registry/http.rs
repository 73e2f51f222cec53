use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::{EndpointRecord, Registration, StatusReport};

use super::{EndpointFilter, EndpointRegistry, RegistryError};

/// REST registry client. Several base URLs may be given; the first one that
/// accepts a registration becomes the active one.
pub struct HttpRegistry {
    client: Client,
    bases: Vec<String>,
    active: AtomicUsize,
}

impl HttpRegistry {
    pub fn new(bases: Vec<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            bases: bases
                .into_iter()
                .map(|b| b.trim_end_matches('/').to_string())
                .collect(),
            active: AtomicUsize::new(0),
        })
    }

    pub fn active_base(&self) -> Option<&str> {
        self.bases
            .get(self.active.load(Ordering::Relaxed))
            .map(String::as_str)
    }

    fn base(&self) -> Result<&str, RegistryError> {
        self.active_base().ok_or(RegistryError::NotConfigured)
    }

    /// Looks up a single record by hardware id.
    pub async fn lookup(&self, hardware_id: &str) -> Result<Option<EndpointRecord>, RegistryError> {
        let url = format!("{}/api/devices/", self.base()?);
        let records: Vec<EndpointRecord> = self
            .client
            .get(url)
            .query(&[("id", hardware_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records.into_iter().next())
    }
}

#[async_trait]
impl EndpointRegistry for HttpRegistry {
    async fn list_endpoints(&self, filter: &EndpointFilter) -> Result<Vec<EndpointRecord>, RegistryError> {
        let url = format!("{}/api/devices/", self.base()?);

        let mut query = Vec::new();
        if let Some(device_type) = &filter.device_type {
            query.push(("type", device_type.as_str()));
        }
        if let Some(alliance) = &filter.alliance {
            query.push(("alliance", alliance.as_str()));
        }

        let records = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records)
    }

    async fn register_self(&self, registration: &Registration) -> Result<(), RegistryError> {
        if self.bases.is_empty() {
            return Err(RegistryError::NotConfigured);
        }

        let start = self.active.load(Ordering::Relaxed);
        let mut last_error = RegistryError::NotConfigured;

        for offset in 0..self.bases.len() {
            let index = (start + offset) % self.bases.len();
            let url = format!("{}/register/", self.bases[index]);

            let result = self
                .client
                .post(&url)
                .json(registration)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(_) => {
                    self.active.store(index, Ordering::Relaxed);
                    tracing::info!("Registered {} with {}", registration.hardware_id, self.bases[index]);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Registration with {} failed: {}", self.bases[index], e);
                    last_error = e.into();
                }
            }
        }

        Err(last_error)
    }

    async fn report_status(&self, report: &StatusReport) -> Result<(), RegistryError> {
        let url = format!("{}/status/", self.base()?);

        self.client
            .post(url)
            .json(report)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
