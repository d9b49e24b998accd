// ── State resolver ──
//
// Pure mapping from a registry capture to the display state and icon
// visibility. Inputs are captured under a single lock acquisition so the
// connectivity state, strength and device count are mutually consistent.

use serde::Serialize;

use crate::model::{ConnectivityState, DeviceKind, DisplayState, SignalBucket};
use crate::store::{Registry, RegistryView};

/// Everything the resolver reads, captured atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResolverInput {
    pub connectivity: ConnectivityState,
    pub active_strength: Option<u8>,
    pub device_count: usize,
    /// Kind of the only device when exactly one exists.
    pub sole_device_kind: Option<DeviceKind>,
}

impl ResolverInput {
    pub fn capture(view: &RegistryView<'_>) -> Self {
        Self {
            connectivity: view.connectivity(),
            active_strength: view.active_strength(),
            device_count: view.device_count(),
            sole_device_kind: view.sole_device_kind(),
        }
    }

    pub fn from_registry(registry: &Registry) -> Self {
        registry.read(|view| Self::capture(view))
    }
}

/// Resolver output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub state: DisplayState,
    pub visible: bool,
}

/// Derive the display state and visibility.
pub fn resolve(input: &ResolverInput) -> Resolution {
    let state = match input.connectivity {
        ConnectivityState::NoDaemon => DisplayState::NoDaemon,
        ConnectivityState::NoConnection => DisplayState::NoConnection,
        ConnectivityState::Wired => DisplayState::Wired,
        ConnectivityState::WiredConnecting => DisplayState::WiredConnecting,
        ConnectivityState::Wireless => {
            DisplayState::Wireless(SignalBucket::from_strength(input.active_strength.unwrap_or(0)))
        }
        ConnectivityState::WirelessConnecting => DisplayState::WirelessConnecting,
        ConnectivityState::WirelessScanning => DisplayState::WirelessScanning,
    };

    Resolution {
        state,
        visible: is_visible(input),
    }
}

/// A lone wired device needs no indicator once the daemon is talking to us;
/// "no connection" is never shown.
fn is_visible(input: &ResolverInput) -> bool {
    match input.connectivity {
        ConnectivityState::NoConnection => false,
        ConnectivityState::NoDaemon => true,
        _ => !(input.device_count == 1 && input.sole_device_kind == Some(DeviceKind::Wired)),
    }
}
