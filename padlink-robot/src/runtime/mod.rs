use std::cell::{Cell, Ref, RefCell};
use std::sync::Arc;
use std::time::Duration;

use padlink_api::signal::{StopSignal, stopped};
use padlink_api::{EndpointRegistry, TransportKind};
use tokio::time::{MissedTickBehavior, interval};

use crate::configs::settings::Settings;
use crate::control::{ActuationPolicy, Actuator, ControlState, LinkStatus, create_policy};
use crate::hardware::Chassis;

pub mod heartbeat;
pub mod listener;
pub mod processor;
#[cfg(feature = "radio")]
pub mod radio;

pub use listener::{Listener, StreamAcceptor};

/// How the robot introduces itself to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotIdentity {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub application: String,
    pub transport: TransportKind,
    pub port: u16,
    /// Advertised radio service name
    pub radio_name: String,
}

impl RobotIdentity {
    pub fn new(settings: &Settings, id: String, policy: &dyn ActuationPolicy) -> Self {
        Self {
            name: settings.robot.name.clone(),
            device_type: settings.robot.device_type.clone(),
            application: settings
                .robot
                .application
                .clone()
                .unwrap_or_else(|| policy.application().into()),
            transport: settings.listener.transport,
            port: settings.listener.port,
            radio_name: radio_name(settings, &id),
            id,
        }
    }
}

/// Name the radio service is advertised under: configured, or device type plus short id.
pub fn radio_name(settings: &Settings, id: &str) -> String {
    settings
        .listener
        .radio_name
        .clone()
        .unwrap_or_else(|| format!("{}-{}", settings.robot.device_type, short_id(id)))
}

/// Last five characters of a hardware id.
fn short_id(id: &str) -> &str {
    id.char_indices()
        .rev()
        .nth(4)
        .map(|(index, _)| &id[index..])
        .unwrap_or(id)
}

/// Robot side of the link: listener, frame processing, actuation and heartbeat
/// on one task, sharing [`ControlState`] without locks.
pub struct RobotRuntime<C: Chassis> {
    identity: RobotIdentity,
    policy: Box<dyn ActuationPolicy>,
    state: RefCell<ControlState>,
    status: Cell<LinkStatus>,
    chassis: RefCell<C>,
    actuator: RefCell<Actuator>,
    registry: Option<Arc<dyn EndpointRegistry>>,
    read_timeout: Duration,
    tick: Duration,
    heartbeat_interval: Duration,
}

impl<C: Chassis> RobotRuntime<C> {
    pub fn new(
        settings: &Settings,
        id: String,
        chassis: C,
        registry: Option<Arc<dyn EndpointRegistry>>,
    ) -> Self {
        let policy = create_policy(&settings.drive);
        let identity = RobotIdentity::new(settings, id, policy.as_ref());

        Self {
            identity,
            policy,
            state: RefCell::new(ControlState::new(settings.servos, settings.assist)),
            status: Cell::new(LinkStatus::Initialized),
            chassis: RefCell::new(chassis),
            actuator: RefCell::new(Actuator::new(&settings.drive)),
            registry,
            read_timeout: settings.listener.read_timeout(),
            tick: settings.drive.tick(),
            heartbeat_interval: settings.heartbeat_interval(),
        }
    }

    pub fn identity(&self) -> &RobotIdentity {
        &self.identity
    }

    pub fn state(&self) -> Ref<'_, ControlState> {
        self.state.borrow()
    }

    pub fn chassis(&self) -> Ref<'_, C> {
        self.chassis.borrow()
    }

    pub fn status(&self) -> LinkStatus {
        self.status.get()
    }

    fn set_status(&self, status: LinkStatus) {
        let previous = self.status.replace(status);
        if previous != status {
            tracing::info!("Link status: {} -> {}", previous, status);
        }
    }

    fn stop_movement(&self) {
        self.state.borrow_mut().stop_movement();
    }

    /// Runs every task until `stop` is raised, then halts the wheels.
    pub async fn run(&self, listener: Listener, stop: StopSignal) {
        tracing::info!(
            "{} {} ({}) starting, listening over {}",
            self.identity.application,
            self.identity.name,
            self.identity.id,
            self.identity.transport
        );

        tokio::join!(
            self.listen(listener, stop.clone()),
            self.actuate(stop.clone()),
            self.heartbeat(stop),
        );

        self.stop_movement();
        self.actuator
            .borrow_mut()
            .halt(self.policy.as_ref(), &mut *self.chassis.borrow_mut());
        tracing::info!("Robot runtime stopped");
    }

    async fn actuate(&self, mut stop: StopSignal) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = ticker.tick() => self.actuate_once(),
            }
        }
    }

    /// One actuation tick.
    pub fn actuate_once(&self) {
        let state = self.state.borrow();
        let mut chassis = self.chassis.borrow_mut();
        self.actuator
            .borrow_mut()
            .step(self.policy.as_ref(), &state, &mut *chassis);
    }
}
