use std::collections::HashMap;
use std::fmt;

use padlink_api::{Control, ControlEvent, ControlKind};

use crate::errors::InputError;

pub mod capability;
pub mod platform;

pub use capability::{AbsTarget, AxisSpec, CapabilityMap, Layout};
pub use platform::{InputBackend, NullBackend, backend_or_null, create_backend};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// Enumeration result from a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub axis_count: usize,
    /// Backends that know their layout say so; others are detected from their axis count
    pub layout: Option<Layout>,
    /// Raw range the device reports per axis code, overriding the layout's
    pub axis_ranges: HashMap<u16, (f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Button { code: u16, pressed: bool },
    Axis { code: u16, value: f32 },
    /// One hat axis by index, value -1, 0 or 1
    Hat { index: u16, value: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawInputEvent {
    pub device: DeviceId,
    pub event: RawEvent,
}

#[derive(Debug)]
pub struct InputDevice {
    pub id: DeviceId,
    pub name: String,
    pub capability: CapabilityMap,
    ranges: HashMap<u16, (f32, f32)>,
    hats: HashMap<Control, i32>,
}

impl InputDevice {
    fn new(info: DeviceInfo) -> Self {
        let capability = match info.layout {
            Some(layout) => CapabilityMap::new(layout),
            None => CapabilityMap::detect(info.axis_count, cfg!(windows)),
        };

        Self {
            id: info.id,
            name: info.name,
            capability,
            ranges: info.axis_ranges,
            hats: HashMap::new(),
        }
    }

    /// Maps one raw event to a canonical event. Hats only report changes.
    pub fn decode(&mut self, event: &RawEvent) -> Option<ControlEvent> {
        match *event {
            RawEvent::Button { code, pressed } => {
                let control = self.capability.button(code)?;
                Some(match control.kind() {
                    // DirectInput pads report triggers as buttons.
                    ControlKind::Axis => ControlEvent::axis(control, if pressed { 1.0 } else { 0.0 }),
                    _ => ControlEvent::button(control, pressed),
                })
            }
            RawEvent::Axis { code, value } => match self.capability.abs(code)? {
                AbsTarget::Axis(mut spec) => {
                    if let Some(&(min, max)) = self.ranges.get(&code) {
                        spec.min = min;
                        spec.max = max;
                    }
                    Some(ControlEvent::axis(spec.control, spec.normalize(value)))
                }
                AbsTarget::Hat(control) => self.hat_changed(control, value.round() as i32),
            },
            RawEvent::Hat { index, value } => {
                let control = self.capability.hat(index)?;
                self.hat_changed(control, value)
            }
        }
    }

    fn hat_changed(&mut self, control: Control, value: i32) -> Option<ControlEvent> {
        let value = value.clamp(-1, 1);
        let previous = self.hats.insert(control, value).unwrap_or(0);
        (previous != value).then(|| ControlEvent::hat(control, value))
    }
}

/// Outcome of one enumeration pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeviceChanges {
    pub attached: Vec<DeviceId>,
    pub detached: Vec<DeviceId>,
}

/// Locally attached gamepads, kept in attach order.
pub struct InputDeviceRegistry {
    backend: Box<dyn InputBackend>,
    devices: Vec<InputDevice>,
}

impl InputDeviceRegistry {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend,
            devices: Vec::new(),
        }
    }

    /// Re-enumerates and diffs against the known set.
    pub fn refresh(&mut self) -> Result<DeviceChanges, InputError> {
        let present = self.backend.enumerate()?;
        let mut changes = DeviceChanges::default();

        self.devices.retain(|device| {
            let still_there = present.iter().any(|info| info.id == device.id);
            if !still_there {
                tracing::info!("Input device {} ({}) detached", device.id, device.name);
                changes.detached.push(device.id.clone());
            }
            still_there
        });

        for info in present {
            if self.contains(&info.id) {
                continue;
            }
            let device = InputDevice::new(info);
            tracing::info!(
                "Input device {} ({}) attached as {:?}",
                device.id,
                device.name,
                device.capability.layout()
            );
            changes.attached.push(device.id.clone());
            self.devices.push(device);
        }

        Ok(changes)
    }

    /// Decodes everything the backend buffered since the last call.
    pub fn poll(&mut self) -> Vec<(DeviceId, ControlEvent)> {
        let raw = self.backend.poll();
        let mut events = Vec::with_capacity(raw.len());

        for RawInputEvent { device, event } in raw {
            let Some(entry) = self.devices.iter_mut().find(|d| d.id == device) else {
                tracing::trace!("Event from unknown device {}", device);
                continue;
            };
            if let Some(decoded) = entry.decode(&event) {
                events.push((device, decoded));
            }
        }

        events
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| &d.id == id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter().map(|d| &d.id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
