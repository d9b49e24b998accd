//! Configuration for the nmtray indicator.
//!
//! TOML file + `NMTRAY_` environment overrides, validated and translated to
//! `nmtray_core::AppletConfig`. Also home to [`FileSettingsStore`], the
//! on-disk record of which wireless networks the user picked.

mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nmtray_core::AppletConfig;

pub use settings::{FileSettingsStore, NetworkUsage};

const MIN_REFRESH_MS: u64 = 100;
const MIN_FRAME_MS: u64 = 10;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonConfig {
    /// Daemon socket. Defaults to `$XDG_RUNTIME_DIR/nmtray/daemon.sock`.
    pub socket: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    1_000
}
fn default_frame_ms() -> u64 {
    125
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingsConfig {
    /// Network usage file. Defaults to `history.toml` in the data dir.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Check interval bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let DisplayConfig {
            refresh_ms,
            frame_ms,
        } = self.display;

        if refresh_ms < MIN_REFRESH_MS {
            return Err(ConfigError::Validation {
                field: "display.refresh_ms".into(),
                reason: format!("must be at least {MIN_REFRESH_MS}, got {refresh_ms}"),
            });
        }
        if frame_ms < MIN_FRAME_MS {
            return Err(ConfigError::Validation {
                field: "display.frame_ms".into(),
                reason: format!("must be at least {MIN_FRAME_MS}, got {frame_ms}"),
            });
        }
        if frame_ms >= refresh_ms {
            return Err(ConfigError::Validation {
                field: "display.frame_ms".into(),
                reason: format!("must be shorter than refresh_ms ({refresh_ms}), got {frame_ms}"),
            });
        }
        Ok(())
    }

    /// Validate and build the core's runtime configuration.
    pub fn to_applet_config(&self) -> Result<AppletConfig, ConfigError> {
        self.validate()?;
        Ok(AppletConfig {
            socket_path: self
                .daemon
                .socket
                .clone()
                .unwrap_or_else(|| AppletConfig::default().socket_path),
            refresh_interval: Duration::from_millis(self.display.refresh_ms),
            frame_interval: Duration::from_millis(self.display.frame_ms),
        })
    }

    /// Where network usage is recorded.
    pub fn settings_path(&self) -> PathBuf {
        self.settings.path.clone().unwrap_or_else(default_settings_path)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "nmtray", "nmtray")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the network usage file.
pub fn default_settings_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("history.toml"),
        |dirs| dirs.data_dir().join("history.toml"),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("nmtray");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical config path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Environment keys nest on a double underscore:
/// `NMTRAY_DISPLAY__REFRESH_MS=500`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NMTRAY_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}
