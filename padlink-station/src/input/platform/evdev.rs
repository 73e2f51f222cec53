use std::collections::HashMap;

use evdev::{Device, InputEventKind, Key};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::InputError;
use crate::input::capability::Layout;
use crate::input::{DeviceId, DeviceInfo, RawEvent, RawInputEvent};

use super::InputBackend;

/// Gamepads under `/dev/input`, read through evdev event streams.
pub struct EvdevBackend {
    tx: mpsc::UnboundedSender<RawInputEvent>,
    rx: mpsc::UnboundedReceiver<RawInputEvent>,
    readers: HashMap<DeviceId, JoinHandle<()>>,
}

impl EvdevBackend {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            readers: HashMap::new(),
        }
    }
}

/// Min and max from the kernel's absinfo for every supported axis.
fn axis_ranges(device: &Device) -> HashMap<u16, (f32, f32)> {
    let Some(axes) = device.supported_absolute_axes() else {
        return HashMap::new();
    };
    let info = match device.get_abs_state() {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!("No absinfo for {:?}: {}", device.name(), e);
            return HashMap::new();
        }
    };

    axes.iter()
        .filter_map(|axis| {
            let abs = info.get(axis.0 as usize)?;
            (abs.maximum > abs.minimum).then(|| (axis.0, (abs.minimum as f32, abs.maximum as f32)))
        })
        .collect()
}

impl InputBackend for EvdevBackend {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, InputError> {
        let mut found = Vec::new();

        for (path, device) in evdev::enumerate() {
            let is_gamepad = device
                .supported_keys()
                .is_some_and(|keys| keys.contains(Key::BTN_SOUTH));
            if !is_gamepad {
                continue;
            }

            let id = DeviceId(path.to_string_lossy().to_string());
            let name = device.name().unwrap_or("gamepad").to_string();
            let axis_count = device.supported_absolute_axes().map_or(0, |a| a.iter().count());
            let axis_ranges = axis_ranges(&device);

            let finished = self.readers.get(&id).is_some_and(|h| h.is_finished());
            if finished || !self.readers.contains_key(&id) {
                match device.into_event_stream() {
                    Ok(mut stream) => {
                        let tx = self.tx.clone();
                        let device_id = id.clone();
                        let handle = tokio::spawn(async move {
                            while let Ok(event) = stream.next_event().await {
                                let raw = match event.kind() {
                                    // Value 2 is auto-repeat.
                                    InputEventKind::Key(key) if event.value() != 2 => RawEvent::Button {
                                        code: key.code(),
                                        pressed: event.value() != 0,
                                    },
                                    InputEventKind::AbsAxis(axis) => RawEvent::Axis {
                                        code: axis.0,
                                        value: event.value() as f32,
                                    },
                                    _ => continue,
                                };
                                if tx.send(RawInputEvent { device: device_id.clone(), event: raw }).is_err() {
                                    break;
                                }
                            }
                            tracing::debug!("Event stream for {} ended", device_id);
                        });
                        self.readers.insert(id.clone(), handle);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to open {}: {}", id, e);
                        continue;
                    }
                }
            }

            found.push(DeviceInfo {
                id,
                name,
                axis_count,
                layout: Some(Layout::Evdev),
                axis_ranges,
            });
        }

        self.readers.retain(|id, handle| {
            let present = found.iter().any(|d| &d.id == id);
            if !present {
                handle.abort();
            }
            present
        });

        Ok(found)
    }

    fn poll(&mut self) -> Vec<RawInputEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
