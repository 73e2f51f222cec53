use std::collections::HashMap;

use padlink_api::EndpointId;

use crate::errors::BindingError;
use crate::input::DeviceId;

/// Live device/endpoint pairings. Both directions are injective.
#[derive(Debug, Default)]
pub struct BindingTable {
    by_device: HashMap<DeviceId, EndpointId>,
    by_endpoint: HashMap<EndpointId, DeviceId>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, device: DeviceId, endpoint: EndpointId) -> Result<(), BindingError> {
        if self.by_device.contains_key(&device) {
            return Err(BindingError::DeviceAlreadyBound(device));
        }
        if self.by_endpoint.contains_key(&endpoint) {
            return Err(BindingError::EndpointAlreadyBound(endpoint));
        }

        self.by_device.insert(device.clone(), endpoint.clone());
        self.by_endpoint.insert(endpoint, device);
        Ok(())
    }

    /// Frees both sides of the binding that holds `endpoint`.
    pub fn unbind_endpoint(&mut self, endpoint: &EndpointId) -> Option<DeviceId> {
        let device = self.by_endpoint.remove(endpoint)?;
        self.by_device.remove(&device);
        Some(device)
    }

    pub fn unbind_device(&mut self, device: &DeviceId) -> Option<EndpointId> {
        let endpoint = self.by_device.remove(device)?;
        self.by_endpoint.remove(&endpoint);
        Some(endpoint)
    }

    pub fn endpoint_for(&self, device: &DeviceId) -> Option<&EndpointId> {
        self.by_device.get(device)
    }

    pub fn device_for(&self, endpoint: &EndpointId) -> Option<&DeviceId> {
        self.by_endpoint.get(endpoint)
    }

    pub fn is_endpoint_bound(&self, endpoint: &EndpointId) -> bool {
        self.by_endpoint.contains_key(endpoint)
    }

    pub fn is_device_bound(&self, device: &DeviceId) -> bool {
        self.by_device.contains_key(device)
    }

    pub fn len(&self) -> usize {
        self.by_device.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_device.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &EndpointId)> {
        self.by_device.iter()
    }

    /// True when the two directions mirror each other exactly.
    pub fn is_consistent(&self) -> bool {
        self.by_device.len() == self.by_endpoint.len()
            && self
                .by_device
                .iter()
                .all(|(device, endpoint)| self.by_endpoint.get(endpoint) == Some(device))
    }
}
