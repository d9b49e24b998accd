// ── Core error types ──
//
// Domain errors from nmtray-core. Consumers never see raw socket or JSON
// failures; the `From<nmtray_api::Error>` impl translates them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors (expected under races) ─────────────────────────
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    #[error("Network '{essid}' not found on device {device_id}")]
    NetworkNotFound { device_id: String, essid: String },

    // ── Daemon errors ────────────────────────────────────────────────
    #[error("Malformed daemon notification: {message}")]
    MalformedEvent { message: String },

    #[error("Network daemon unavailable: {reason}")]
    DaemonUnavailable { reason: String },

    // ── Settings store ───────────────────────────────────────────────
    #[error("Failed to record network usage: {message}")]
    StoreWriteFailed { message: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stale-handle errors that the concurrency model produces routinely.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::NetworkNotFound { .. }
        )
    }

    pub(crate) fn device_not_found(device_id: impl ToString) -> Self {
        Self::DeviceNotFound {
            device_id: device_id.to_string(),
        }
    }

    pub(crate) fn network_not_found(device_id: impl ToString, essid: impl Into<String>) -> Self {
        Self::NetworkNotFound {
            device_id: device_id.to_string(),
            essid: essid.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nmtray_api::Error> for CoreError {
    fn from(err: nmtray_api::Error) -> Self {
        match err {
            nmtray_api::Error::MalformedEvent { message, line: _ } => {
                CoreError::MalformedEvent { message }
            }
            nmtray_api::Error::Connect { .. }
            | nmtray_api::Error::Io(_)
            | nmtray_api::Error::Closed => CoreError::DaemonUnavailable {
                reason: err.to_string(),
            },
            nmtray_api::Error::Encode(e) => {
                CoreError::Internal(format!("request encoding failed: {e}"))
            }
        }
    }
}
