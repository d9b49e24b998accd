// ── Network usage store ──
//
// Records the last time each wireless network was picked from the menu.
// On disk:
//
//   [wireless.networks."home"]
//   essid = "home"
//   timestamp = 1760000000
//
// The whole document is rewritten on every record (temp file + rename).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use nmtray_core::{CoreError, SettingsStore};

use crate::ConfigError;

/// One recorded network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkUsage {
    pub essid: String,
    /// Unix seconds of the most recent selection.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct SettingsDocument {
    #[serde(default)]
    wireless: WirelessSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct WirelessSection {
    #[serde(default)]
    networks: BTreeMap<String, NetworkUsage>,
}

/// TOML-file-backed [`SettingsStore`].
pub struct FileSettingsStore {
    path: PathBuf,
    document: Mutex<SettingsDocument>,
}

impl FileSettingsStore {
    /// Open the store, loading an existing file if there is one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let document = load_document(&path)?;
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn network_usage(&self, essid: &str) -> Option<NetworkUsage> {
        self.document().wireless.networks.get(essid).cloned()
    }

    /// All recorded networks, most recent first.
    pub fn networks(&self) -> Vec<NetworkUsage> {
        let mut all: Vec<NetworkUsage> = self.document().wireless.networks.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.essid.cmp(&b.essid)));
        all
    }

    /// Update one entry and rewrite the file under the lock. Memory only
    /// changes once the file is written.
    pub fn record(&self, essid: &str, timestamp: i64) -> Result<(), ConfigError> {
        let mut document = self.document();
        let mut updated = document.clone();
        updated.wireless.networks.insert(
            essid.to_owned(),
            NetworkUsage {
                essid: essid.to_owned(),
                timestamp,
            },
        );
        persist(&self.path, &updated)?;
        *document = updated;
        debug!(%essid, timestamp, path = %self.path.display(), "network usage recorded");
        Ok(())
    }

    fn document(&self) -> MutexGuard<'_, SettingsDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for FileSettingsStore {
    fn record_network_usage(&self, essid: &str, timestamp_secs: i64) -> Result<(), CoreError> {
        self.record(essid, timestamp_secs)
            .map_err(|e| CoreError::StoreWriteFailed {
                message: e.to_string(),
            })
    }
}

fn load_document(path: &Path) -> Result<SettingsDocument, ConfigError> {
    if !path.exists() {
        return Ok(SettingsDocument::default());
    }
    let data = std::fs::read_to_string(path)?;
    let document: SettingsDocument = toml::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        networks = document.wireless.networks.len(),
        path = %path.display(),
        "network usage loaded"
    );
    Ok(document)
}

/// Write to a sibling temp file, then rename over the target.
fn persist(path: &Path, document: &SettingsDocument) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(document)?;
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, toml_str)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
