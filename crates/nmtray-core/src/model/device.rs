// ── Device and wireless network domain types ──

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound of every signal strength the registry stores.
pub const MAX_STRENGTH: u8 = 100;

/// Clamp a daemon-reported strength into `0..=100`.
pub fn clamp_strength(raw: i32) -> u8 {
    u8::try_from(raw.clamp(0, i32::from(MAX_STRENGTH))).unwrap_or(MAX_STRENGTH)
}

// ── DeviceId ────────────────────────────────────────────────────────

/// Daemon-assigned device identifier.
///
/// This is the only handle consumers ever hold for a device. It carries no
/// reference into the registry; every use goes through a fresh lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ── DeviceKind ──────────────────────────────────────────────────────

/// Device class. Fixed for the lifetime of a device in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Wired,
    Wireless,
    Other,
}

impl DeviceKind {
    /// Menu ordering rank: wired first, then wireless, then everything else.
    pub fn sort_rank(self) -> u8 {
        match self {
            Self::Wired => 0,
            Self::Wireless => 1,
            Self::Other => 2,
        }
    }
}

// ── WirelessNetwork ─────────────────────────────────────────────────

/// A wireless network visible to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessNetwork {
    pub essid: String,
    pub strength: u8,
    pub encrypted: bool,
    pub active: bool,
}

// ── NetworkDevice ───────────────────────────────────────────────────

/// A network device mirrored from the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDevice {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    /// Aggregate signal strength. Only meaningful for wireless devices with
    /// no active network.
    pub strength: u8,
    /// Visible networks keyed by essid.
    pub networks: HashMap<String, WirelessNetwork>,
}

impl NetworkDevice {
    pub fn new(id: DeviceId, kind: DeviceKind, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            strength: 0,
            networks: HashMap::new(),
        }
    }

    /// The network currently marked active, if any.
    pub fn active_network(&self) -> Option<&WirelessNetwork> {
        self.networks.values().find(|n| n.active)
    }

    pub fn network(&self, essid: &str) -> Option<&WirelessNetwork> {
        self.networks.get(essid)
    }

    pub fn is_wireless(&self) -> bool {
        self.kind == DeviceKind::Wireless
    }

    /// Strength used for the signal icon: the active network's, falling back
    /// to the device aggregate.
    pub fn effective_strength(&self) -> u8 {
        self.active_network().map_or(self.strength, |n| n.strength)
    }
}
