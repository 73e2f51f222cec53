use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use padlink_station::errors::RadioError;
use padlink_station::radio::{Advertisement, RadioAdapter, RadioConnection};
use tokio::time::Instant;

/// What the peripherals handed out by a [`FakeRadio`] received.
#[derive(Clone, Default)]
pub struct ConnectionLog {
    pub writes: Arc<Mutex<Vec<String>>>,
    pub disconnects: Arc<AtomicU32>,
}

impl ConnectionLog {
    pub fn frames(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn disconnect_count(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct State {
    nearby: Vec<String>,
    errors: VecDeque<RadioError>,
    scans: Vec<Instant>,
    /// Names the filter let through, one entry per completed scan
    accepted: Vec<Vec<String>>,
}

/// Adapter advertising a test-controlled set of peripherals.
#[derive(Clone, Default)]
pub struct FakeRadio {
    state: Arc<Mutex<State>>,
    hang: Arc<AtomicBool>,
    unsupported: Arc<AtomicBool>,
    connects: Arc<AtomicU32>,
    pub log: ConnectionLog,
}

impl FakeRadio {
    pub fn new(nearby: &[&str]) -> Self {
        let radio = Self::default();
        radio.set_nearby(nearby);
        radio
    }

    pub fn set_nearby(&self, nearby: &[&str]) {
        self.state.lock().unwrap().nearby = nearby.iter().map(|n| n.to_string()).collect();
    }

    /// The next scans fail with `errors`, in order.
    pub fn fail_scans(&self, errors: Vec<RadioError>) {
        self.state.lock().unwrap().errors = errors.into();
    }

    /// Scans never return, keeping the radio busy.
    pub fn hang_scans(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Peripherals connect but lack the control service.
    pub fn without_control_service(&self) {
        self.unsupported.store(true, Ordering::SeqCst);
    }

    pub fn scan_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().scans.clone()
    }

    pub fn scan_count(&self) -> usize {
        self.state.lock().unwrap().scans.len()
    }

    pub fn accepted(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().accepted.clone()
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RadioAdapter for FakeRadio {
    async fn scan(
        &self,
        _window: Duration,
        _min_rssi: i16,
        accept: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync),
    ) -> Result<Option<Advertisement>, RadioError> {
        self.state.lock().unwrap().scans.push(Instant::now());
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.errors.pop_front() {
            return Err(error);
        }

        let accepted: Vec<String> = state.nearby.iter().filter(|n| accept(n.as_str())).cloned().collect();
        let found = accepted.first().map(|name| Advertisement {
            name: name.clone(),
            address: format!("addr-{name}"),
            rssi: Some(-50),
        });
        state.accepted.push(accepted);
        Ok(found)
    }

    async fn connect(&self, _advertisement: &Advertisement) -> Result<Box<dyn RadioConnection>, RadioError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            supported: !self.unsupported.load(Ordering::SeqCst),
            log: self.log.clone(),
        }))
    }
}

struct FakeConnection {
    supported: bool,
    log: ConnectionLog,
}

#[async_trait]
impl RadioConnection for FakeConnection {
    fn supports_control_service(&self) -> bool {
        self.supported
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), RadioError> {
        self.log
            .writes
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(data).to_string());
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.log.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
