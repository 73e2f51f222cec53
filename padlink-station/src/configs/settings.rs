use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use padlink_api::models::EndpointRecord;
use serde::{Deserialize, Serialize};

use crate::transport::RetryPolicy;

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
pub struct Station {
    /// Hardware id reported to the registry; generated when absent
    pub id: Option<String>,
    pub name: String,
    /// Only bind robots of this alliance
    pub alliance: Option<String>,
    /// Registry device type to control
    pub endpoint_type: String,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            id: None,
            name: "Driver Station".into(),
            alliance: None,
            endpoint_type: "XRP".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Orchestrator {
    pub device_scan_secs: u64,
    pub endpoint_scan_secs: u64,
    pub status_report_secs: u64,
    pub input_poll_ms: u64,
    pub teardown_timeout_ms: u64,
    /// Queued events per session before input is dropped
    pub event_buffer: usize,
}

impl Orchestrator {
    pub fn device_scan_interval(&self) -> Duration {
        Duration::from_secs(self.device_scan_secs.max(1))
    }

    pub fn endpoint_scan_interval(&self) -> Duration {
        Duration::from_secs(self.endpoint_scan_secs.max(1))
    }

    pub fn status_report_interval(&self) -> Duration {
        Duration::from_secs(self.status_report_secs.max(1))
    }

    pub fn input_poll_interval(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms.max(1))
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            device_scan_secs: 5,
            endpoint_scan_secs: 10,
            status_report_secs: 30,
            input_poll_ms: 10,
            teardown_timeout_ms: 2000,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Codec {
    /// Last axis digit must be a multiple of this; 1 disables
    pub throttle_factor: u32,
}

impl Default for Codec {
    fn default() -> Self {
        Self { throttle_factor: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub url_base: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Host for udp/tcp, peripheral name for radio
    pub address: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub transport: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

impl EndpointConfig {
    pub fn to_record(&self) -> EndpointRecord {
        let radio = self.transport.eq_ignore_ascii_case("radio");
        EndpointRecord {
            hardware_id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            ip_address: if radio { String::new() } else { self.address.clone() },
            port: self.port.map(|p| p.to_string()).unwrap_or_default(),
            protocol: self.transport.clone(),
            state: "registered".into(),
            ble_service: radio.then(|| self.address.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Radio {
    pub enabled: bool,
    /// Accepted name prefix when no allow-list is set
    pub name_prefix: String,
    pub allow_list: Vec<String>,
    pub scan_window_secs: u64,
    pub min_rssi: i16,
    pub error_backoff_secs: u64,
    /// Pause between scans so connects can take the radio
    pub rest_ms: u64,
}

impl Default for Radio {
    fn default() -> Self {
        Self {
            enabled: false,
            name_prefix: "XRP".into(),
            allow_list: Vec::new(),
            scan_window_secs: 60,
            min_rssi: -80,
            error_backoff_secs: 3,
            rest_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Retry {
    pub udp: RetryPolicy,
    pub tcp: RetryPolicy,
    pub radio: RetryPolicy,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            udp: RetryPolicy::udp(),
            tcp: RetryPolicy::tcp(),
            radio: RetryPolicy::radio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tcp {
    pub connect_timeout_ms: u64,
}

impl Default for Tcp {
    fn default() -> Self {
        Self { connect_timeout_ms: 3000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputBackendKind {
    Evdev,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub backend: InputBackendKind,
}

impl Default for Input {
    fn default() -> Self {
        Self { backend: InputBackendKind::Evdev }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub station: Station,
    pub orchestrator: Orchestrator,
    pub codec: Codec,
    pub registries: Vec<Registry>,
    pub endpoints: Vec<EndpointConfig>,
    pub radio: Radio,
    pub retry: Retry,
    pub tcp: Tcp,
    pub input: Input,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("PADLINK").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn enabled_registries(&self) -> Vec<String> {
        self.registries
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.url_base.clone())
            .collect()
    }

    pub fn static_records(&self) -> Vec<EndpointRecord> {
        self.endpoints
            .iter()
            .filter(|e| e.enabled)
            .map(EndpointConfig::to_record)
            .collect()
    }
}

fn enabled() -> bool {
    true
}
