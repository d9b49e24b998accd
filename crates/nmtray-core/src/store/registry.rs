// ── Device/network registry ──
//
// The one piece of cross-thread shared mutable state. Every read and every
// write takes the same mutex for its whole duration; compound updates run
// inside a single `transaction` so no reader ever observes an intermediate
// state. Each committed change bumps a version published on a `watch`
// channel so the foreground can re-resolve without polling.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{ConnectivityState, DeviceId, DeviceKind, NetworkDevice, WirelessNetwork};

#[derive(Debug, Default)]
struct RegistryState {
    devices: HashMap<DeviceId, NetworkDevice>,
    /// Weak reference: an id, re-validated against `devices` on every read.
    active: Option<DeviceId>,
    connectivity: ConnectivityState,
}

/// Process-wide registry of network devices and their visible networks.
///
/// Shared by `Arc` between the sync worker (sole writer in production) and
/// the foreground (resolver, menu, dispatcher).
pub struct Registry {
    state: Mutex<RegistryState>,
    version: watch::Sender<u64>,
}

impl Registry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            state: Mutex::new(RegistryState::default()),
            version,
        }
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Run `f` with exclusive access. Everything `f` does is observed by
    /// other threads as a single step.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut RegistryTxn<'_>) -> R) -> R {
        let (result, changed) = {
            let mut guard = self.lock();
            let mut txn = RegistryTxn {
                state: &mut guard,
                changed: false,
            };
            let result = f(&mut txn);
            (result, txn.changed)
        };
        if changed {
            self.version.send_modify(|v| *v = v.wrapping_add(1));
        }
        result
    }

    /// Run `f` against a consistent read-only view.
    pub fn read<R>(&self, f: impl FnOnce(&RegistryView<'_>) -> R) -> R {
        let guard = self.lock();
        f(&RegistryView { state: &guard })
    }

    // ── Single-step mutations ───────────────────────────────────────

    /// Insert a device, or rename it in place. Returns its handle.
    pub fn upsert_device(&self, id: &str, kind: DeviceKind, name: &str) -> DeviceId {
        self.transaction(|txn| txn.upsert_device(id, kind, name))
    }

    pub fn remove_device(&self, id: &str) {
        self.transaction(|txn| txn.remove_device(id));
    }

    /// Point the active reference at `id`, or clear it with `None`.
    /// An unknown id is ignored. Returns whether the reference was applied.
    pub fn set_active(&self, id: Option<&str>) -> bool {
        self.transaction(|txn| txn.set_active(id))
    }

    pub fn upsert_network(
        &self,
        device_id: &str,
        essid: &str,
        strength: u8,
        encrypted: bool,
    ) -> Result<(), CoreError> {
        self.transaction(|txn| txn.upsert_network(device_id, essid, strength, encrypted))
    }

    /// Drop every network on the device whose essid is not in `present`.
    /// Returns how many were removed.
    pub fn prune_networks(
        &self,
        device_id: &str,
        present: &HashSet<String>,
    ) -> Result<usize, CoreError> {
        self.transaction(|txn| txn.prune_networks(device_id, present))
    }

    pub fn set_network_active(&self, device_id: &str, essid: &str) -> Result<(), CoreError> {
        self.transaction(|txn| txn.set_network_active(device_id, essid))
    }

    /// Replace the device's network set with a fresh scan, atomically.
    pub fn apply_scan<I>(&self, device_id: &str, networks: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = ScanEntry>,
    {
        self.transaction(|txn| txn.apply_scan(device_id, networks))
    }

    pub fn set_connectivity(&self, state: ConnectivityState) {
        self.transaction(|txn| txn.set_connectivity(state));
    }

    /// Forget every device and fall back to `NoDaemon`.
    pub fn mark_daemon_unavailable(&self) {
        self.transaction(|txn| txn.reset_to_no_daemon());
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Strength of the active network on the active device, else the active
    /// device's aggregate strength, else `None`.
    pub fn snapshot_active_strength(&self) -> Option<u8> {
        self.read(|view| view.active_strength())
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.read(|view| view.connectivity())
    }

    pub fn device_count(&self) -> usize {
        self.read(|view| view.device_count())
    }

    pub fn device(&self, id: &str) -> Option<NetworkDevice> {
        self.read(|view| view.device(id).cloned())
    }

    pub fn active_device_id(&self) -> Option<DeviceId> {
        self.read(|view| view.active_device().map(|d| d.id.clone()))
    }

    /// Owned, consistent copy of the whole registry.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.read(|view| view.snapshot())
    }

    // ── Change notification ─────────────────────────────────────────

    /// Current version; bumped once per committed change.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Transactions validate before they mutate, so state left behind by a
    /// panicking holder is still consistent.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// One network as reported by a scan, already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub essid: String,
    pub strength: u8,
    pub encrypted: bool,
}

// ── RegistryTxn ──────────────────────────────────────────────────────

/// Mutable access to the registry while its lock is held.
pub struct RegistryTxn<'a> {
    state: &'a mut RegistryState,
    changed: bool,
}

impl RegistryTxn<'_> {
    /// Read-only view of the in-progress state.
    pub fn view(&self) -> RegistryView<'_> {
        RegistryView { state: &*self.state }
    }

    pub fn upsert_device(&mut self, id: &str, kind: DeviceKind, name: &str) -> DeviceId {
        let id = DeviceId::from(id);
        match self.state.devices.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let device = entry.get_mut();
                if device.kind != kind {
                    debug!(device = %id, from = %device.kind, to = %kind, "device kind changed");
                    device.kind = kind;
                    self.changed = true;
                }
                if device.name != name {
                    name.clone_into(&mut device.name);
                    self.changed = true;
                }
            }
            Entry::Vacant(entry) => {
                debug!(device = %id, %kind, "device added");
                entry.insert(NetworkDevice::new(id.clone(), kind, name));
                self.changed = true;
            }
        }
        id
    }

    pub fn remove_device(&mut self, id: &str) {
        if self.state.devices.remove(id).is_none() {
            debug!(device = id, "remove for unknown device ignored");
            return;
        }
        if self.state.active.as_ref().is_some_and(|a| a.as_str() == id) {
            self.state.active = None;
        }
        debug!(device = id, "device removed");
        self.changed = true;
    }

    pub fn set_active(&mut self, id: Option<&str>) -> bool {
        let next = match id {
            None => None,
            Some(id) => match self.state.devices.get(id) {
                Some(device) => Some(device.id.clone()),
                None => {
                    debug!(device = id, "set_active for unknown device ignored");
                    return false;
                }
            },
        };
        if self.state.active != next {
            self.state.active = next;
            self.changed = true;
        }
        true
    }

    pub fn upsert_network(
        &mut self,
        device_id: &str,
        essid: &str,
        strength: u8,
        encrypted: bool,
    ) -> Result<(), CoreError> {
        if essid.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: format!("empty essid reported for device {device_id}"),
            });
        }
        let device = self.device_mut(device_id)?;
        match device.networks.get_mut(essid) {
            Some(network) => {
                network.strength = strength;
                network.encrypted = encrypted;
            }
            None => {
                device.networks.insert(
                    essid.to_owned(),
                    WirelessNetwork {
                        essid: essid.to_owned(),
                        strength,
                        encrypted,
                        active: false,
                    },
                );
            }
        }
        self.changed = true;
        Ok(())
    }

    pub fn prune_networks(
        &mut self,
        device_id: &str,
        present: &HashSet<String>,
    ) -> Result<usize, CoreError> {
        let device = self.device_mut(device_id)?;
        let before = device.networks.len();
        device.networks.retain(|essid, _| present.contains(essid));
        let removed = before - device.networks.len();
        if removed > 0 {
            self.changed = true;
        }
        Ok(removed)
    }

    pub fn set_network_active(&mut self, device_id: &str, essid: &str) -> Result<(), CoreError> {
        let device = self.device_mut(device_id)?;
        if !device.networks.contains_key(essid) {
            return Err(CoreError::network_not_found(device_id, essid));
        }
        for network in device.networks.values_mut() {
            network.active = network.essid == essid;
        }
        self.changed = true;
        Ok(())
    }

    /// Clear the active flag on every network of the device.
    pub fn clear_network_active(&mut self, device_id: &str) -> Result<(), CoreError> {
        let device = self.device_mut(device_id)?;
        let mut cleared = false;
        for network in device.networks.values_mut().filter(|n| n.active) {
            network.active = false;
            cleared = true;
        }
        if cleared {
            self.changed = true;
        }
        Ok(())
    }

    pub fn set_device_strength(&mut self, device_id: &str, strength: u8) -> Result<(), CoreError> {
        let device = self.device_mut(device_id)?;
        if device.strength != strength {
            device.strength = strength;
            self.changed = true;
        }
        Ok(())
    }

    /// Prune to the scanned essids, then upsert each of them. Entries with
    /// an empty essid are skipped; a repeated essid keeps its last values.
    pub fn apply_scan<I>(&mut self, device_id: &str, networks: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = ScanEntry>,
    {
        self.device_mut(device_id)?;

        let entries: Vec<ScanEntry> = networks
            .into_iter()
            .filter(|entry| {
                if entry.essid.is_empty() {
                    warn!(device = device_id, "scan entry with empty essid skipped");
                    false
                } else {
                    true
                }
            })
            .collect();
        let present: HashSet<String> = entries.iter().map(|e| e.essid.clone()).collect();

        self.prune_networks(device_id, &present)?;
        for entry in entries {
            self.upsert_network(device_id, &entry.essid, entry.strength, entry.encrypted)?;
        }
        Ok(())
    }

    pub fn set_connectivity(&mut self, state: ConnectivityState) {
        if self.state.connectivity != state {
            debug!(from = %self.state.connectivity, to = %state, "connectivity changed");
            self.state.connectivity = state;
            self.changed = true;
        }
    }

    /// Drop every device and the active reference; state becomes `NoDaemon`.
    /// Always publishes a new version, so waiters learn the daemon is gone
    /// even when the registry already looked that way.
    pub fn reset_to_no_daemon(&mut self) {
        self.state.devices.clear();
        self.state.active = None;
        self.set_connectivity(ConnectivityState::NoDaemon);
        self.changed = true;
    }

    fn device_mut(&mut self, device_id: &str) -> Result<&mut NetworkDevice, CoreError> {
        self.state
            .devices
            .get_mut(device_id)
            .ok_or_else(|| CoreError::device_not_found(device_id))
    }
}

// ── RegistryView ─────────────────────────────────────────────────────

/// Read-only access to the registry while its lock is held.
pub struct RegistryView<'a> {
    state: &'a RegistryState,
}

impl<'a> RegistryView<'a> {
    pub fn device(&self, id: &str) -> Option<&'a NetworkDevice> {
        self.state.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &'a NetworkDevice> + use<'a> {
        self.state.devices.values()
    }

    pub fn device_count(&self) -> usize {
        self.state.devices.len()
    }

    /// The active device, if the reference still resolves.
    pub fn active_device(&self) -> Option<&'a NetworkDevice> {
        self.state
            .active
            .as_ref()
            .and_then(|id| self.state.devices.get(id))
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.state.connectivity
    }

    pub fn active_strength(&self) -> Option<u8> {
        self.active_device().map(NetworkDevice::effective_strength)
    }

    /// The only device's kind when exactly one device exists.
    pub fn sole_device_kind(&self) -> Option<DeviceKind> {
        let mut devices = self.state.devices.values();
        match (devices.next(), devices.next()) {
            (Some(only), None) => Some(only.kind),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut devices: Vec<NetworkDevice> = self.state.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        RegistrySnapshot {
            devices,
            active: self.active_device().map(|d| d.id.clone()),
            connectivity: self.state.connectivity,
        }
    }
}

/// Owned copy of the registry at one instant. Devices are ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub devices: Vec<NetworkDevice>,
    pub active: Option<DeviceId>,
    pub connectivity: ConnectivityState,
}

impl RegistrySnapshot {
    pub fn device(&self, id: &str) -> Option<&NetworkDevice> {
        self.devices.iter().find(|d| d.id.as_str() == id)
    }
}
