// ── Runtime applet configuration ──
//
// Describes *where* the daemon lives and *how often* the display refreshes.
// Core never touches disk: `nmtray-config` (or a test) builds an
// `AppletConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

/// Default period of the refresh tick.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Default period of the animation frame timer.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(125);

/// Configuration for one applet session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppletConfig {
    /// Unix socket the daemon listens on.
    pub socket_path: PathBuf,
    /// How often the display state is re-resolved unconditionally.
    pub refresh_interval: Duration,
    /// How often a transitional animation advances one frame.
    pub frame_interval: Duration,
}

impl Default for AppletConfig {
    fn default() -> Self {
        Self {
            socket_path: nmtray_api::default_socket_path(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}
