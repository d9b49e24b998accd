// ── Command dispatch ──
//
// Menu activations arrive as typed `Selection`s. Each one is validated
// against the registry, turned into a fire-and-forget daemon request, and
// (for wireless networks) recorded in the settings store.

use std::sync::{Arc, Mutex, PoisonError};

use nmtray_api::DaemonRequest;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::RequestHandle;
use crate::error::CoreError;
use crate::model::{DeviceId, DeviceKind};
use crate::store::{Registry, RegistryView};

/// The target of a menu activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    /// Activate a device with no particular network.
    Device { device_id: DeviceId },
    /// Activate a network the device has seen in a scan.
    Network { device_id: DeviceId, essid: String },
    /// Activate a user-typed network name on a wireless device.
    Custom { device_id: DeviceId, essid: String },
}

impl Selection {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Device { device_id }
            | Self::Network { device_id, .. }
            | Self::Custom { device_id, .. } => device_id,
        }
    }

    pub fn essid(&self) -> Option<&str> {
        match self {
            Self::Device { .. } => None,
            Self::Network { essid, .. } | Self::Custom { essid, .. } => Some(essid),
        }
    }
}

// ── Settings store ───────────────────────────────────────────────────

/// Persistent record of which wireless networks the user picked, and when.
pub trait SettingsStore: Send + Sync {
    fn record_network_usage(&self, essid: &str, timestamp_secs: i64) -> Result<(), CoreError>;
}

/// In-memory store. Keeps the latest timestamp per essid.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    entries: Mutex<Vec<(String, i64)>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(essid, timestamp)` pairs in first-use order.
    pub fn entries(&self) -> Vec<(String, i64)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn record_network_usage(&self, essid: &str, timestamp_secs: i64) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(e, _)| e == essid) {
            Some(entry) => entry.1 = timestamp_secs,
            None => entries.push((essid.to_owned(), timestamp_secs)),
        }
        Ok(())
    }
}

// ── CommandDispatcher ────────────────────────────────────────────────

/// Validates selections and forwards them to the sync worker.
pub struct CommandDispatcher {
    registry: Arc<Registry>,
    requests: RequestHandle,
    settings: Arc<dyn SettingsStore>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<Registry>,
        requests: RequestHandle,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            registry,
            requests,
            settings,
        }
    }

    /// Validate, queue, and record.
    ///
    /// Stale selections fail with `DeviceNotFound` / `NetworkNotFound`; the
    /// caller should report those quietly. A settings store failure is
    /// logged and does not fail the dispatch.
    pub fn dispatch(&self, selection: &Selection) -> Result<(), CoreError> {
        let request = self
            .registry
            .read(|view| build_request(view, selection))
            .inspect_err(|e| {
                if e.is_not_found() {
                    debug!(?selection, error = %e, "stale selection");
                }
            })?;

        let essid = match &request {
            DaemonRequest::SetActive { essid, .. } => essid.clone(),
        };
        self.requests.send(request)?;

        if let Some(essid) = essid {
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = self.settings.record_network_usage(&essid, now) {
                warn!(%essid, error = %e, "failed to record network usage");
            }
        }
        Ok(())
    }

    pub fn select_device(&self, device_id: &str) -> Result<(), CoreError> {
        self.dispatch(&Selection::Device {
            device_id: device_id.into(),
        })
    }

    pub fn select_network(&self, device_id: &str, essid: &str) -> Result<(), CoreError> {
        self.dispatch(&Selection::Network {
            device_id: device_id.into(),
            essid: essid.into(),
        })
    }

    pub fn select_custom_network(&self, device_id: &str, essid: &str) -> Result<(), CoreError> {
        self.dispatch(&Selection::Custom {
            device_id: device_id.into(),
            essid: essid.into(),
        })
    }
}

/// Check the selection against the current registry and build the request.
fn build_request(view: &RegistryView<'_>, selection: &Selection) -> Result<DaemonRequest, CoreError> {
    let device_id = selection.device_id();
    let device = view
        .device(device_id.as_str())
        .ok_or_else(|| CoreError::device_not_found(device_id))?;

    let essid = match selection {
        Selection::Device { .. } => None,
        Selection::Network { essid, .. } => {
            if device.network(essid).is_none() {
                return Err(CoreError::network_not_found(device_id, essid.as_str()));
            }
            Some(essid.clone())
        }
        Selection::Custom { essid, .. } => {
            if device.kind != DeviceKind::Wireless {
                return Err(CoreError::ValidationFailed {
                    message: format!("device {device_id} is not wireless"),
                });
            }
            let essid = essid.trim();
            if essid.is_empty() {
                return Err(CoreError::ValidationFailed {
                    message: "network name is empty".into(),
                });
            }
            Some(essid.to_owned())
        }
    };

    Ok(DaemonRequest::SetActive {
        device_id: device_id.to_string(),
        essid,
    })
}
