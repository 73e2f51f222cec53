use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use padlink_api::TransportKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Robot {
    /// Hardware id reported to the registry; generated when absent
    pub id: Option<String>,
    pub name: String,
    /// Overrides the application name of the drive profile
    pub application: Option<String>,
    pub device_type: String,
}

impl Default for Robot {
    fn default() -> Self {
        Self {
            id: None,
            name: "XRP".into(),
            application: None,
            device_type: "XRP".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Listener {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    /// Silence longer than this stops the robot
    pub read_timeout_ms: u64,
    /// Advertised radio service name; derived from the hardware id when absent
    pub radio_name: Option<String>,
}

impl Listener {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            transport: TransportKind::Udp,
            host: "0.0.0.0".into(),
            port: 9999,
            read_timeout_ms: 5000,
            radio_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveProfile {
    Arcade,
    Mecanum,
    ServoTriggers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Drive {
    pub profile: DriveProfile,
    pub tick_ms: u64,
    /// Turn scale applied while driving
    pub turn_damping: f32,
    pub heading_kp: f32,
    pub heading_kd: f32,
    pub proximity_threshold_cm: f32,
}

impl Drive {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self {
            profile: DriveProfile::Arcade,
            tick_ms: 25,
            turn_damping: 0.3,
            heading_kp: 0.075,
            heading_kd: 0.001,
            proximity_threshold_cm: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Assist {
    pub imu_assist: bool,
    pub proximity_assist: bool,
}

impl Default for Assist {
    fn default() -> Self {
        Self {
            imu_assist: true,
            proximity_assist: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Servos {
    pub count: usize,
    pub min_angle: f32,
    pub max_angle: f32,
}

impl Default for Servos {
    fn default() -> Self {
        Self {
            count: 2,
            min_angle: 0.0,
            max_angle: 180.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub url_base: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub robot: Robot,
    pub listener: Listener,
    pub drive: Drive,
    pub assist: Assist,
    pub servos: Servos,
    pub heartbeat_secs: u64,
    pub registries: Vec<Registry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logger: Logger::default(),
            robot: Robot::default(),
            listener: Listener::default(),
            drive: Drive::default(),
            assist: Assist::default(),
            servos: Servos::default(),
            heartbeat_secs: 15,
            registries: Vec::new(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("PADLINK_ROBOT").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn enabled_registries(&self) -> Vec<String> {
        self.registries
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.url_base.clone())
            .collect()
    }
}

fn enabled() -> bool {
    true
}
