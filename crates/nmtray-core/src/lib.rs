//! Network state model and synchronization engine for the nmtray indicator.
//!
//! The crate sits between the daemon transport (`nmtray-api`) and whatever
//! front-end draws the icon and menu:
//!
//! - **[`Registry`]**: the single shared store of devices, their visible
//!   wireless networks, the active-device reference and the coarse
//!   connectivity state. One lock; compound updates are transactions.
//!
//! - **[`SyncEngine`]**: a dedicated worker thread owning the daemon link.
//!   Applies notifications to the registry in delivery order and writes
//!   outbound requests. A failed or lost connection leaves the registry in
//!   `NoDaemon`; there is no reconnect.
//!
//! - **[`resolve`]**: pure mapping from a registry capture to a
//!   [`DisplayState`] and icon visibility.
//!
//! - **[`CommandDispatcher`]**: validates typed [`Selection`]s, forwards
//!   them to the worker and records wireless network usage.
//!
//! - **[`RefreshDriver`]**: refresh tick plus animation frame timer,
//!   rendering [`DisplayView`]s through a [`Presenter`].
//!
//! - **[`Applet`]**: the facade tying it all together.

pub mod applet;
pub mod command;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod menu;
pub mod model;
pub mod refresh;
pub mod resolver;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use applet::Applet;
pub use command::{CommandDispatcher, MemorySettingsStore, Selection, SettingsStore};
pub use config::AppletConfig;
pub use engine::{Connector, RequestHandle, SyncEngine, UnixConnector, apply_event};
pub use error::CoreError;
pub use menu::{Menu, MenuEntry, NetworkSummary};
pub use refresh::{Animation, FrameTimerAction, Presenter, RefreshDriver};
pub use resolver::{Resolution, ResolverInput, resolve};
pub use store::{Registry, RegistrySnapshot, ScanEntry};

pub use model::{
    ConnectivityState, DeviceId, DeviceKind, DisplayKind, DisplayState, DisplayView,
    NetworkDevice, SignalBucket, WirelessNetwork,
};
