use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `nmtray-api` crate.
///
/// `nmtray-core` maps these into domain errors; consumers of the core never
/// see raw I/O or JSON failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The daemon socket could not be reached.
    #[error("Cannot connect to daemon at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure on an established link.
    #[error("Daemon link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The daemon closed the link.
    #[error("Daemon closed the connection")]
    Closed,

    // ── Protocol ────────────────────────────────────────────────────
    /// A notification line could not be decoded.
    #[error("Malformed daemon notification: {message}")]
    MalformedEvent { message: String, line: String },

    /// An outbound request could not be encoded.
    #[error("Failed to encode daemon request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// Whether the link is unusable after this error.
    ///
    /// Malformed notifications are skippable; everything else ends the
    /// connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedEvent { .. } | Self::Encode(_))
    }
}
