// ── Registry storage layer ──
//
// Thread-safe device/network registry. The sync worker writes, the
// foreground reads; both go through the same lock.

mod registry;

pub use registry::{Registry, RegistrySnapshot, RegistryTxn, RegistryView, ScanEntry};
