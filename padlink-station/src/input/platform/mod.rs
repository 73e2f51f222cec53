use crate::errors::InputError;

use super::{DeviceInfo, RawInputEvent};

#[cfg(all(feature = "evdev", target_os = "linux"))]
pub mod evdev;

/// Source of attached gamepads and their raw events.
pub trait InputBackend: Send {
    /// Currently attached devices. Ids must stay stable while a device stays attached.
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, InputError>;

    /// Raw events received since the last call. Never blocks.
    fn poll(&mut self) -> Vec<RawInputEvent>;
}

/// Backend with no devices, used when no platform backend is compiled in.
#[derive(Debug, Default)]
pub struct NullBackend;

impl InputBackend for NullBackend {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, InputError> {
        Ok(Vec::new())
    }

    fn poll(&mut self) -> Vec<RawInputEvent> {
        Vec::new()
    }
}

/// Returns the backend named in settings, or `Unavailable` when it is not compiled in.
pub fn create_backend(kind: crate::configs::settings::InputBackendKind) -> Result<Box<dyn InputBackend>, InputError> {
    use crate::configs::settings::InputBackendKind;

    match kind {
        InputBackendKind::None => Ok(Box::new(NullBackend)),
        #[cfg(all(feature = "evdev", target_os = "linux"))]
        InputBackendKind::Evdev => Ok(Box::new(evdev::EvdevBackend::new())),
        #[cfg(not(all(feature = "evdev", target_os = "linux")))]
        InputBackendKind::Evdev => Err(InputError::Unavailable("evdev".into())),
    }
}

/// Like [`create_backend`], but degrades to [`NullBackend`] with a startup warning.
pub fn backend_or_null(kind: crate::configs::settings::InputBackendKind) -> Box<dyn InputBackend> {
    create_backend(kind).unwrap_or_else(|e| {
        tracing::warn!("{}; no gamepads will be detected", e);
        Box::new(NullBackend)
    })
}
