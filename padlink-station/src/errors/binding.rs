use padlink_api::EndpointId;

use crate::input::DeviceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("Input device {0} is already bound")]
    DeviceAlreadyBound(DeviceId),

    #[error("Endpoint {0} is already bound")]
    EndpointAlreadyBound(EndpointId),
}
