// ── Wire-to-domain conversions ──
//
// `nmtray-api` types describe the daemon protocol; these impls map them
// onto the canonical domain model.

use nmtray_api::wire;

use crate::model::{ConnectivityState, DeviceKind};

impl From<wire::DeviceKind> for DeviceKind {
    fn from(kind: wire::DeviceKind) -> Self {
        match kind {
            wire::DeviceKind::Wired => Self::Wired,
            wire::DeviceKind::Wireless => Self::Wireless,
            wire::DeviceKind::Other => Self::Other,
        }
    }
}

impl From<wire::ConnectivityState> for ConnectivityState {
    fn from(state: wire::ConnectivityState) -> Self {
        match state {
            wire::ConnectivityState::NoDaemon => Self::NoDaemon,
            wire::ConnectivityState::NoConnection => Self::NoConnection,
            wire::ConnectivityState::Wired => Self::Wired,
            wire::ConnectivityState::WiredConnecting => Self::WiredConnecting,
            wire::ConnectivityState::Wireless => Self::Wireless,
            wire::ConnectivityState::WirelessConnecting => Self::WirelessConnecting,
            wire::ConnectivityState::WirelessScanning => Self::WirelessScanning,
        }
    }
}
