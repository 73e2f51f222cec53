use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use padlink_api::models::{Registration, StatusReport};
use padlink_api::registry::local_ip;
use padlink_api::signal::{StopSignal, stop_channel, stopped};
use padlink_api::{
    Codec, ConnectionState, ControlEvent, Endpoint, EndpointAddress, EndpointFilter, EndpointId,
    EndpointRecord, EndpointRegistry, ThrottlePolicy,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::configs::settings::{self, Settings};
use crate::input::{DeviceId, InputDeviceRegistry};
use crate::radio::RadioScanner;
use crate::transport::LinkFactory;

use super::binding::BindingTable;
use super::link_session::{LinkSession, SessionOutcome, SessionReport};

/// Who this station is, as told to the registry.
#[derive(Debug, Clone)]
pub struct StationIdentity {
    pub id: String,
    pub name: String,
    pub alliance: Option<String>,
    pub endpoint_type: String,
}

struct SessionHandle {
    id: u64,
    device: DeviceId,
    events: mpsc::Sender<ControlEvent>,
    stop: watch::Sender<bool>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

/// Keeps input devices and robots paired across churn and failure.
pub struct Orchestrator {
    settings: settings::Orchestrator,
    identity: StationIdentity,
    throttle: ThrottlePolicy,
    registry: Arc<dyn EndpointRegistry>,
    inputs: InputDeviceRegistry,
    links: Arc<dyn LinkFactory>,
    scanner: Option<Arc<RadioScanner>>,
    /// Tracked endpoints in discovery order
    endpoints: Vec<Endpoint>,
    bindings: BindingTable,
    sessions: HashMap<EndpointId, SessionHandle>,
    /// Endpoints whose last session failed, with the reason. Skipped by
    /// `try_bind` until their record changes.
    failed: HashMap<EndpointId, String>,
    reports_tx: mpsc::UnboundedSender<SessionReport>,
    reports_rx: mpsc::UnboundedReceiver<SessionReport>,
    next_session: u64,
    registered: bool,
}

impl Orchestrator {
    pub fn new(
        settings: &Settings,
        identity: StationIdentity,
        registry: Arc<dyn EndpointRegistry>,
        inputs: InputDeviceRegistry,
        links: Arc<dyn LinkFactory>,
        scanner: Option<Arc<RadioScanner>>,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();

        Self {
            settings: settings.orchestrator.clone(),
            identity,
            throttle: ThrottlePolicy {
                factor: settings.codec.throttle_factor,
            },
            registry,
            inputs,
            links,
            scanner,
            endpoints: Vec::new(),
            bindings: BindingTable::new(),
            sessions: HashMap::new(),
            failed: HashMap::new(),
            reports_tx,
            reports_rx,
            next_session: 0,
            registered: false,
        }
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn inputs(&self) -> &InputDeviceRegistry {
        &self.inputs
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connection_state(&self, endpoint: &EndpointId) -> ConnectionState {
        if let Some(session) = self.sessions.get(endpoint) {
            return *session.state.borrow();
        }
        if self.failed.contains_key(endpoint) {
            ConnectionState::Failed
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Why `endpoint` was marked failed, if it was.
    pub fn failure(&self, endpoint: &EndpointId) -> Option<&str> {
        self.failed.get(endpoint).map(String::as_str)
    }

    /// Main loop. Returns after `shutdown` is raised and every session has stopped.
    pub async fn run(mut self, mut shutdown: StopSignal) {
        let start = Instant::now();
        let mut device_tick = interval_at(
            start + self.settings.device_scan_interval(),
            self.settings.device_scan_interval(),
        );
        let mut endpoint_tick = interval_at(
            start + self.settings.endpoint_scan_interval(),
            self.settings.endpoint_scan_interval(),
        );
        let mut input_tick = interval_at(start, self.settings.input_poll_interval());
        let mut status_tick = interval_at(start, self.settings.status_report_interval());
        for tick in [&mut device_tick, &mut endpoint_tick, &mut input_tick, &mut status_tick] {
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        tracing::info!("Orchestrator {} started", self.identity.id);
        self.refresh_endpoints().await;
        self.reconcile_input_devices().await;

        loop {
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                Some(report) = self.next_report() => self.handle_report(report).await,
                _ = input_tick.tick() => self.pump_input(),
                _ = device_tick.tick() => self.reconcile_input_devices().await,
                _ = endpoint_tick.tick() => self.refresh_endpoints().await,
                _ = status_tick.tick() => self.report_status().await,
            }
        }

        self.shutdown().await;
        tracing::info!("Orchestrator stopped");
    }

    /// Fetches the endpoint list and reconciles against it. Registry failures skip the pass.
    pub async fn refresh_endpoints(&mut self) {
        let filter = EndpointFilter {
            device_type: Some(self.identity.endpoint_type.clone()),
            alliance: self.identity.alliance.clone(),
        };

        match self.registry.list_endpoints(&filter).await {
            Ok(records) => {
                self.reconcile_endpoints(&records).await;
                self.bind_free_devices().await;
            }
            Err(e) => tracing::warn!("Endpoint refresh skipped: {}", e),
        }
    }

    /// Brings the tracked endpoint set in line with `records`. A malformed
    /// record is skipped on its own and leaves any tracked copy untouched.
    pub async fn reconcile_endpoints(&mut self, records: &[EndpointRecord]) {
        let mut known: Vec<Endpoint> = Vec::with_capacity(records.len());
        let mut malformed: HashSet<EndpointId> = HashSet::new();

        for record in records {
            match Endpoint::try_from(record) {
                Ok(endpoint) => {
                    if known.iter().any(|e| e.id == endpoint.id) {
                        tracing::warn!("Duplicate endpoint record {} ignored", endpoint.id);
                        continue;
                    }
                    known.push(endpoint);
                }
                Err(e) => {
                    tracing::warn!("Skipping endpoint record {:?}: {}", record.hardware_id, e);
                    malformed.insert(EndpointId(record.hardware_id.trim().to_string()));
                }
            }
        }

        let removed: Vec<EndpointId> = self
            .endpoints
            .iter()
            .filter(|tracked| !malformed.contains(&tracked.id) && !known.iter().any(|k| k.id == tracked.id))
            .map(|tracked| tracked.id.clone())
            .collect();
        for id in removed {
            self.teardown(&id, "endpoint no longer listed").await;
            self.failed.remove(&id);
            if let Some(index) = self.endpoints.iter().position(|e| e.id == id) {
                let endpoint = self.endpoints.remove(index);
                self.forget_radio_name(&endpoint).await;
                tracing::info!("Endpoint {} dropped", id);
            }
        }

        for endpoint in known {
            match self.endpoints.iter().position(|e| e.id == endpoint.id) {
                Some(index) => {
                    if !self.endpoints[index].same_target(&endpoint) {
                        tracing::info!(
                            "Endpoint {} changed: {} {} -> {} {}",
                            endpoint.id,
                            self.endpoints[index].transport,
                            self.endpoints[index].address,
                            endpoint.transport,
                            endpoint.address
                        );
                        self.teardown(&endpoint.id, "endpoint changed").await;
                        if self.failed.remove(&endpoint.id).is_some() {
                            tracing::info!("Endpoint {} is eligible again", endpoint.id);
                        }
                        let previous = std::mem::replace(&mut self.endpoints[index], endpoint);
                        self.forget_radio_name(&previous).await;
                        let current = self.endpoints[index].clone();
                        self.remember_radio_name(&current).await;
                    } else {
                        self.endpoints[index].name = endpoint.name;
                    }
                }
                None => {
                    tracing::info!(
                        "Endpoint {} discovered at {} over {}",
                        endpoint.id,
                        endpoint.address,
                        endpoint.transport
                    );
                    self.remember_radio_name(&endpoint).await;
                    self.endpoints.push(endpoint);
                }
            }
        }
    }

    /// Re-enumerates input devices, releasing bindings of detached ones and
    /// binding free ones.
    pub async fn reconcile_input_devices(&mut self) {
        match self.inputs.refresh() {
            Ok(changes) => {
                for device in &changes.detached {
                    if let Some(endpoint) = self.bindings.endpoint_for(device).cloned() {
                        self.teardown(&endpoint, "input device detached").await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Input enumeration failed: {}", e);
                return;
            }
        }

        self.bind_free_devices().await;
    }

    async fn bind_free_devices(&mut self) {
        let free: Vec<DeviceId> = self
            .inputs
            .device_ids()
            .filter(|d| !self.bindings.is_device_bound(d))
            .cloned()
            .collect();

        for device in free {
            if self.try_bind(&device).is_none() {
                break;
            }
        }
    }

    /// Binds `device` to the first free endpoint in discovery order and
    /// starts its session. Failed endpoints are not free.
    pub fn try_bind(&mut self, device: &DeviceId) -> Option<EndpointId> {
        if self.bindings.is_device_bound(device) {
            return self.bindings.endpoint_for(device).cloned();
        }

        let candidates: Vec<Endpoint> = self
            .endpoints
            .iter()
            .filter(|e| !self.bindings.is_endpoint_bound(&e.id) && !self.failed.contains_key(&e.id))
            .cloned()
            .collect();

        for endpoint in candidates {
            let connector = match self.links.create(&endpoint) {
                Ok(connector) => connector,
                Err(e) => {
                    tracing::warn!("Cannot bind endpoint {}: {}", endpoint.id, e);
                    self.failed.insert(endpoint.id.clone(), e.to_string());
                    continue;
                }
            };

            if let Err(e) = self.bindings.bind(device.clone(), endpoint.id.clone()) {
                tracing::error!("Binding table rejected {} -> {}: {}", device, endpoint.id, e);
                return None;
            }

            self.next_session += 1;
            let (events_tx, events_rx) = mpsc::channel(self.settings.event_buffer.max(1));
            let (stop_tx, stop_rx) = stop_channel();
            let state = connector.subscribe();
            let session = LinkSession::new(
                self.next_session,
                device.clone(),
                endpoint.id.clone(),
                connector,
                Codec::new(self.throttle),
                events_rx,
                self.reports_tx.clone(),
                stop_rx,
            );

            self.sessions.insert(
                endpoint.id.clone(),
                SessionHandle {
                    id: self.next_session,
                    device: device.clone(),
                    events: events_tx,
                    stop: stop_tx,
                    state,
                    task: tokio::spawn(session.run()),
                },
            );

            tracing::info!("Bound {} -> {} ({})", device, endpoint.id, endpoint.address);
            return Some(endpoint.id);
        }

        None
    }

    /// Stops the session on `endpoint`, waits for it, and frees both sides.
    pub async fn teardown(&mut self, endpoint: &EndpointId, reason: &str) {
        if let Some(mut handle) = self.sessions.remove(endpoint) {
            let _ = handle.stop.send(true);
            drop(handle.events);

            if tokio::time::timeout(self.settings.teardown_timeout(), &mut handle.task)
                .await
                .is_err()
            {
                tracing::warn!("Session on {} did not stop in time, aborting", endpoint);
                handle.task.abort();
            }
            tracing::debug!("Session {} on {} joined", handle.id, endpoint);
        }

        if let Some(device) = self.bindings.unbind_endpoint(endpoint) {
            tracing::info!("Released {} -> {}: {}", device, endpoint, reason);
        }
    }

    /// Routes decoded input to the bound session.
    pub fn pump_input(&mut self) {
        for (device, event) in self.inputs.poll() {
            let Some(endpoint) = self.bindings.endpoint_for(&device) else {
                tracing::trace!("Unbound device {} sent {}", device, event.name);
                continue;
            };
            let Some(session) = self.sessions.get(endpoint) else {
                continue;
            };
            if let Err(mpsc::error::TrySendError::Full(event)) = session.events.try_send(event) {
                tracing::warn!("Session {} -> {} is backed up, dropping {}", session.device, endpoint, event.name);
            }
        }
    }

    /// Waits for the next session exit.
    pub async fn next_report(&mut self) -> Option<SessionReport> {
        self.reports_rx.recv().await
    }

    /// Releases the binding of an exited session and rebinds the freed
    /// device. A failed endpoint stays out of rotation until its record
    /// changes. Reports from sessions that were already replaced are ignored.
    pub async fn handle_report(&mut self, report: SessionReport) {
        let current = self
            .sessions
            .get(&report.endpoint)
            .is_some_and(|s| s.id == report.session);
        if !current {
            return;
        }

        let reason = match &report.outcome {
            SessionOutcome::Failed(e) => format!("transport failed: {}", e),
            SessionOutcome::InputClosed => "input closed".to_string(),
            SessionOutcome::Stopped => "session stopped".to_string(),
        };
        self.teardown(&report.endpoint, &reason).await;

        if let SessionOutcome::Failed(e) = report.outcome {
            tracing::warn!("Endpoint {} marked failed until its record changes", report.endpoint);
            self.failed.insert(report.endpoint, e.to_string());
        }
        self.bind_free_devices().await;
    }

    pub async fn report_status(&mut self) {
        if !self.registered {
            let registration = Registration {
                hardware_id: self.identity.id.clone(),
                device_type: "Driver Station".into(),
                name: self.identity.name.clone(),
                ip_address: local_ip().to_string(),
                port: String::new(),
                protocol: String::new(),
                application: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                status: "Running".into(),
                ble_service: None,
            };
            match self.registry.register_self(&registration).await {
                Ok(()) => self.registered = true,
                Err(e) => {
                    tracing::warn!("Station registration failed: {}", e);
                    return;
                }
            }
        }

        let report = StatusReport {
            hardware_id: self.identity.id.clone(),
            status: format!(
                "Running: {} devices, {} endpoints, {} bindings",
                self.inputs.len(),
                self.endpoints.len(),
                self.bindings.len()
            ),
        };
        if let Err(e) = self.registry.report_status(&report).await {
            tracing::warn!("Status report failed: {}", e);
        }
    }

    async fn remember_radio_name(&self, endpoint: &Endpoint) {
        if let (Some(scanner), EndpointAddress::Radio { name }) = (&self.scanner, &endpoint.address) {
            scanner.allow(name).await;
        }
    }

    async fn forget_radio_name(&self, endpoint: &Endpoint) {
        if let (Some(scanner), EndpointAddress::Radio { name }) = (&self.scanner, &endpoint.address) {
            scanner.disallow(name).await;
        }
    }

    /// Stops every session.
    pub async fn shutdown(&mut self) {
        let endpoints: Vec<EndpointId> = self.sessions.keys().cloned().collect();
        for endpoint in endpoints {
            self.teardown(&endpoint, "station shutting down").await;
        }
    }
}
