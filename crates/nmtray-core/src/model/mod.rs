// ── Domain model ──
//
// Canonical types shared by the registry, resolver, dispatcher and
// presentation facade. Wire types from `nmtray-api` are converted into
// these in `convert.rs` and never leak past the engine.

pub mod device;
pub mod display;

pub use device::{
    DeviceId, DeviceKind, MAX_STRENGTH, NetworkDevice, WirelessNetwork, clamp_strength,
};
pub use display::{ConnectivityState, DisplayKind, DisplayState, DisplayView, SignalBucket};
