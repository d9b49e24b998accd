//! Transport layer for the network-management daemon protocol.
//!
//! The daemon speaks newline-delimited JSON over a Unix stream socket:
//!
//! - **[`DaemonEvent`]**: asynchronous notifications (device lifecycle,
//!   scan results, active device/network, coarse connectivity state).
//! - **[`DaemonRequest`]**: outbound, fire-and-forget commands.
//! - **[`EventReader`] / [`RequestWriter`]**: the two halves of a link,
//!   generic over any `AsyncRead` / `AsyncWrite` so tests can run them over
//!   `tokio::io::duplex`.
//!
//! Nothing in this crate knows about the registry or display state; that is
//! `nmtray-core`'s job.

pub mod error;
pub mod link;
pub mod wire;

pub use error::Error;
pub use link::{
    EventReader, MAX_LINE_BYTES, RequestWriter, connect, default_socket_path, from_halves,
};
pub use wire::{
    ConnectivityState, DaemonEvent, DaemonRequest, DeviceKind, ScannedNetwork, encode_request,
    parse_event,
};
