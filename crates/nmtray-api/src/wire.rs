// ── Daemon wire types ──
//
// One JSON object per line. Inbound objects are tagged by `"event"`,
// outbound objects by `"request"`. Field names are snake_case.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Device class as reported by the daemon.
///
/// Unrecognized kinds decode as [`DeviceKind::Other`] instead of failing the
/// whole notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum DeviceKind {
    Wired,
    Wireless,
    Other,
}

impl From<String> for DeviceKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "wired" => Self::Wired,
            "wireless" => Self::Wireless,
            _ => Self::Other,
        }
    }
}

/// Coarse connectivity state published by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    NoDaemon,
    NoConnection,
    Wired,
    WiredConnecting,
    Wireless,
    WirelessConnecting,
    WirelessScanning,
}

/// A single network inside a scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedNetwork {
    pub essid: String,
    /// Signal quality, nominally 0–100. Out-of-range values are clamped by
    /// the consumer, not rejected here.
    pub strength: i32,
    #[serde(default)]
    pub encrypted: bool,
}

/// Asynchronous notification from the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DaemonEvent {
    DeviceAdded {
        id: String,
        kind: DeviceKind,
        name: String,
        /// Aggregate signal for wireless devices, if the daemon knows it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strength: Option<i32>,
    },
    DeviceRemoved {
        id: String,
    },
    DeviceStrength {
        id: String,
        strength: i32,
    },
    /// Authoritative replacement of a device's visible network set.
    ScanResult {
        device_id: String,
        #[serde(default)]
        networks: Vec<ScannedNetwork>,
    },
    ActiveChanged {
        #[serde(default)]
        device_id: Option<String>,
        #[serde(default)]
        essid: Option<String>,
    },
    StateChanged {
        state: ConnectivityState,
    },
}

impl DaemonEvent {
    /// Short name used in log fields.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::DeviceAdded { .. } => "device_added",
            Self::DeviceRemoved { .. } => "device_removed",
            Self::DeviceStrength { .. } => "device_strength",
            Self::ScanResult { .. } => "scan_result",
            Self::ActiveChanged { .. } => "active_changed",
            Self::StateChanged { .. } => "state_changed",
        }
    }
}

/// Outbound command. The daemon never replies directly; confirmation, if
/// any, arrives later as an `active_changed` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum DaemonRequest {
    SetActive {
        device_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        essid: Option<String>,
    },
}

/// Decode one notification line.
pub fn parse_event(line: &str) -> Result<DaemonEvent, Error> {
    serde_json::from_str(line.trim()).map_err(|e| Error::MalformedEvent {
        message: e.to_string(),
        line: line.to_owned(),
    })
}

/// Encode a request as a single line, including the trailing newline.
pub fn encode_request(request: &DaemonRequest) -> Result<String, Error> {
    let mut line = serde_json::to_string(request).map_err(Error::Encode)?;
    line.push('\n');
    Ok(line)
}
