// ── Menu model ──
//
// Ordered, typed menu entries built from one registry read. Every entry
// carries the `Selection` it dispatches, so the presentation layer needs no
// side tables keyed by widget.

use std::cmp::Ordering;

use serde::Serialize;

use crate::command::Selection;
use crate::model::{ConnectivityState, DeviceId, DeviceKind, NetworkDevice, WirelessNetwork};
use crate::store::RegistryView;

pub const DAEMON_NOT_RUNNING_LABEL: &str = "Network daemon is not running...";
pub const NO_DEVICES_LABEL: &str = "No network devices have been found";
pub const CUSTOM_NETWORK_LABEL: &str = "Other Wireless Networks...";

/// One visible wireless network under a device entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub essid: String,
    pub strength: u8,
    pub encrypted: bool,
    pub active: bool,
    pub selection: Selection,
}

/// One device row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub device_id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
    /// Whether this is the daemon's active device.
    pub active: bool,
    /// Strongest first, ties by essid. Empty for non-wireless devices.
    pub networks: Vec<NetworkSummary>,
    pub selection: Selection,
}

/// The whole menu as the presentation layer should render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "menu", rename_all = "snake_case")]
pub enum Menu {
    DaemonNotRunning,
    NoDevices,
    Devices {
        entries: Vec<MenuEntry>,
        /// Offer a free-form network entry (at least one wireless device).
        offers_custom_network: bool,
    },
}

impl Menu {
    pub fn build(view: &RegistryView<'_>) -> Self {
        if view.connectivity() == ConnectivityState::NoDaemon {
            return Self::DaemonNotRunning;
        }
        let entries = menu_entries(view);
        if entries.is_empty() {
            return Self::NoDevices;
        }
        let offers_custom_network = entries.iter().any(|e| e.kind == DeviceKind::Wireless);
        Self::Devices {
            entries,
            offers_custom_network,
        }
    }
}

/// Devices ordered wired, wireless, other, then by name.
pub fn menu_entries(view: &RegistryView<'_>) -> Vec<MenuEntry> {
    let active = view.active_device().map(|d| &d.id);
    let mut devices: Vec<&NetworkDevice> = view.devices().collect();
    devices.sort_by(|a, b| compare_devices(a, b));

    devices
        .into_iter()
        .map(|device| MenuEntry {
            device_id: device.id.clone(),
            name: device.name.clone(),
            kind: device.kind,
            active: active == Some(&device.id),
            networks: network_summaries(device),
            selection: Selection::Device {
                device_id: device.id.clone(),
            },
        })
        .collect()
}

fn compare_devices(a: &NetworkDevice, b: &NetworkDevice) -> Ordering {
    a.kind
        .sort_rank()
        .cmp(&b.kind.sort_rank())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

fn network_summaries(device: &NetworkDevice) -> Vec<NetworkSummary> {
    if !device.is_wireless() {
        return Vec::new();
    }
    let mut networks: Vec<&WirelessNetwork> = device.networks.values().collect();
    networks.sort_by(|a, b| b.strength.cmp(&a.strength).then_with(|| a.essid.cmp(&b.essid)));

    networks
        .into_iter()
        .map(|n| NetworkSummary {
            essid: n.essid.clone(),
            strength: n.strength,
            encrypted: n.encrypted,
            active: n.active,
            selection: Selection::Network {
                device_id: device.id.clone(),
                essid: n.essid.clone(),
            },
        })
        .collect()
}
