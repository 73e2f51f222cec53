use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use padlink_api::{Endpoint, EndpointId};
use padlink_station::errors::TransportError;
use padlink_station::transport::{Link, LinkFactory, RetryPolicy, TransportConnector};

/// Shared view of what a [`ScriptedLink`] did.
#[derive(Clone, Default)]
pub struct LinkLog {
    pub opens: Arc<AtomicU32>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub closes: Arc<AtomicU32>,
}

impl LinkLog {
    pub fn frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

/// Link that replays scripted results, succeeding once the script runs out.
pub struct ScriptedLink {
    pub open_results: VecDeque<Result<(), TransportError>>,
    pub send_results: VecDeque<Result<(), TransportError>>,
    /// Result used once the open script is exhausted
    pub open_default: Result<(), TransportError>,
    pub log: LinkLog,
}

impl ScriptedLink {
    pub fn new(log: LinkLog) -> Self {
        Self {
            open_results: VecDeque::new(),
            send_results: VecDeque::new(),
            open_default: Ok(()),
            log,
        }
    }

    pub fn with_opens(mut self, results: Vec<Result<(), TransportError>>) -> Self {
        self.open_results = results.into();
        self
    }

    pub fn with_sends(mut self, results: Vec<Result<(), TransportError>>) -> Self {
        self.send_results = results.into();
        self
    }

    pub fn always_failing(mut self, error: TransportError) -> Self {
        self.open_default = Err(error);
        self
    }
}

#[async_trait]
impl Link for ScriptedLink {
    fn target(&self) -> String {
        "scripted".into()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        self.open_results
            .pop_front()
            .unwrap_or_else(|| self.open_default.clone())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let result = self.send_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.log
                .sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(bytes).to_string());
        }
        result
    }

    async fn close(&mut self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out scripted links and keeping one log per endpoint.
#[derive(Clone, Default)]
pub struct FakeLinkFactory {
    logs: Arc<Mutex<HashMap<EndpointId, LinkLog>>>,
    refusing: Arc<Mutex<Vec<EndpointId>>>,
}

impl FakeLinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, endpoint: &str) -> LinkLog {
        self.logs
            .lock()
            .unwrap()
            .entry(EndpointId::from(endpoint))
            .or_default()
            .clone()
    }

    /// Every later connect to `endpoint` is refused.
    pub fn refuse(&self, endpoint: &str) {
        self.refusing.lock().unwrap().push(EndpointId::from(endpoint));
    }
}

impl LinkFactory for FakeLinkFactory {
    fn create(&self, endpoint: &Endpoint) -> Result<TransportConnector, TransportError> {
        let log = self.log(&endpoint.id.0);
        let mut link = ScriptedLink::new(log);
        if self.refusing.lock().unwrap().contains(&endpoint.id) {
            link = link.always_failing(TransportError::Refused(endpoint.id.0.clone()));
        }
        Ok(TransportConnector::new(Box::new(link), endpoint.transport, RetryPolicy::tcp()))
    }
}
