use serde::{Deserialize, Deserializer, Serialize};

/// Device record as stored by the field-management registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Stable hardware identifier
    pub hardware_id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Device category, e.g. "XRP"
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub ip_address: String,
    /// Stored as text by the registry, robots post numbers
    #[serde(default, deserialize_with = "port_from_any")]
    pub port: String,
    /// Transport name: udp, tcp, radio
    #[serde(default)]
    pub protocol: String,
    /// Registry lifecycle state (unknown, registered, unregistered)
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alliance: Option<String>,
    /// Advertised radio service name
    #[serde(default)]
    pub ble_service: Option<String>,
}

fn port_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
        Missing(Option<()>),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
        Port::Missing(_) => String::new(),
    })
}

/// Payload for `POST /register/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub hardware_id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub ip_address: String,
    pub port: String,
    pub protocol: String,
    pub application: String,
    pub version: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ble_service: Option<String>,
}

/// Payload for `POST /status/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub hardware_id: String,
    pub status: String,
}
