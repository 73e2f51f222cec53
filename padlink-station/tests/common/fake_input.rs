use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use padlink_station::errors::InputError;
use padlink_station::input::{DeviceId, DeviceInfo, InputBackend, Layout, RawEvent, RawInputEvent};

#[derive(Default)]
struct State {
    devices: Vec<DeviceInfo>,
    events: Vec<RawInputEvent>,
}

/// Backend whose devices and events are driven by the test.
#[derive(Clone, Default)]
pub struct FakeInput {
    state: Arc<Mutex<State>>,
}

impl FakeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> Box<dyn InputBackend> {
        Box::new(self.clone())
    }

    pub fn attach(&self, id: &str) {
        self.state.lock().unwrap().devices.push(DeviceInfo {
            id: DeviceId::from(id),
            name: format!("pad {id}"),
            axis_count: 6,
            layout: Some(Layout::XInput),
            axis_ranges: HashMap::new(),
        });
    }

    pub fn detach(&self, id: &str) {
        self.state.lock().unwrap().devices.retain(|d| d.id.0 != id);
    }

    pub fn attached(&self) -> Vec<DeviceId> {
        self.state.lock().unwrap().devices.iter().map(|d| d.id.clone()).collect()
    }

    pub fn push(&self, id: &str, event: RawEvent) {
        self.state.lock().unwrap().events.push(RawInputEvent {
            device: DeviceId::from(id),
            event,
        });
    }
}

impl InputBackend for FakeInput {
    fn enumerate(&mut self) -> Result<Vec<DeviceInfo>, InputError> {
        Ok(self.state.lock().unwrap().devices.clone())
    }

    fn poll(&mut self) -> Vec<RawInputEvent> {
        std::mem::take(&mut self.state.lock().unwrap().events)
    }
}
