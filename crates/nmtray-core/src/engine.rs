// ── Synchronization engine ──
//
// One dedicated OS thread owns the daemon link. It applies each inbound
// notification to the registry as a single transaction, in delivery order,
// and writes outbound requests queued by the dispatcher. The foreground
// never blocks on the daemon.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use nmtray_api::{DaemonEvent, DaemonRequest, EventReader, RequestWriter};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::model::clamp_strength;
use crate::store::{Registry, ScanEntry};

const WORKER_THREAD_NAME: &str = "nmtray-daemon";

// ── Connector ────────────────────────────────────────────────────────

/// How the worker obtains its daemon link.
pub trait Connector: Send + 'static {
    type Read: AsyncRead + Unpin + Send + 'static;
    type Write: AsyncWrite + Unpin + Send + 'static;

    fn connect(
        &self,
    ) -> impl Future<
        Output = Result<(EventReader<Self::Read>, RequestWriter<Self::Write>), nmtray_api::Error>,
    > + Send;
}

/// Connects to the daemon's Unix socket.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Connector for UnixConnector {
    type Read = OwnedReadHalf;
    type Write = OwnedWriteHalf;

    async fn connect(
        &self,
    ) -> Result<(EventReader<OwnedReadHalf>, RequestWriter<OwnedWriteHalf>), nmtray_api::Error>
    {
        nmtray_api::connect(&self.path).await
    }
}

// ── SyncEngine ───────────────────────────────────────────────────────

/// Handle to the running sync worker.
///
/// Dropping the handle cancels the worker but does not wait for it; call
/// [`shutdown`](Self::shutdown) to join.
pub struct SyncEngine {
    requests: mpsc::UnboundedSender<DaemonRequest>,
    cancel: CancellationToken,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Spawn the worker thread. The registry starts (and stays, if the
    /// connection fails) in `NoDaemon`.
    pub fn start<C: Connector>(registry: Arc<Registry>, connector: C) -> Result<Self, CoreError> {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker_cancel = cancel.clone();
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || run_worker(connector, &registry, request_rx, &worker_cancel))
            .map_err(|e| CoreError::Internal(format!("failed to spawn sync worker: {e}")))?;

        Ok(Self {
            requests,
            cancel,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// A cloneable sender for the dispatcher.
    pub fn request_handle(&self) -> RequestHandle {
        RequestHandle {
            tx: self.requests.clone(),
        }
    }

    /// Whether the worker has exited (connection lost, failed, or cancelled).
    pub fn is_finished(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Cancel the worker and wait for its thread. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("sync worker panicked");
            }
            debug!("sync worker joined");
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Cheap cloneable handle for queueing outbound requests.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    tx: mpsc::UnboundedSender<DaemonRequest>,
}

impl RequestHandle {
    pub fn send(&self, request: DaemonRequest) -> Result<(), CoreError> {
        self.tx.send(request).map_err(|_| CoreError::DaemonUnavailable {
            reason: "sync worker has stopped".into(),
        })
    }

    /// A handle paired with its receiving end, for driving a dispatcher
    /// without a worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DaemonRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

// ── Worker ───────────────────────────────────────────────────────────

fn run_worker<C: Connector>(
    connector: C,
    registry: &Registry,
    requests: mpsc::UnboundedReceiver<DaemonRequest>,
    cancel: &CancellationToken,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build sync worker runtime");
            registry.mark_daemon_unavailable();
            return;
        }
    };

    runtime.block_on(session(connector, registry, requests, cancel));
}

/// One daemon session: connect, then pump notifications and requests until
/// the link dies or we are cancelled. Never reconnects.
async fn session<C: Connector>(
    connector: C,
    registry: &Registry,
    mut requests: mpsc::UnboundedReceiver<DaemonRequest>,
    cancel: &CancellationToken,
) {
    let connected = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = connector.connect() => result,
    };
    let (mut reader, mut writer) = match connected {
        Ok(link) => link,
        Err(e) => {
            error!(error = %CoreError::from(e), "could not reach network daemon");
            registry.mark_daemon_unavailable();
            return;
        }
    };
    info!("sync worker connected");

    let mut requests_open = true;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("sync worker cancelled");
                flush_pending(&mut requests, &mut writer).await;
                break;
            }
            event = reader.next_event() => match event {
                Ok(Some(event)) => apply_logged(registry, event),
                Ok(None) => {
                    let e = CoreError::from(nmtray_api::Error::Closed);
                    error!(error = %e, "lost connection to network daemon");
                    registry.mark_daemon_unavailable();
                    break;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %CoreError::from(e), "skipping daemon notification");
                }
                Err(e) => {
                    error!(error = %CoreError::from(e), "lost connection to network daemon");
                    registry.mark_daemon_unavailable();
                    break;
                }
            },
            request = requests.recv(), if requests_open => match request {
                Some(request) => {
                    if let Err(e) = writer.send(&request).await {
                        warn!(error = %e, ?request, "failed to send request to daemon");
                    }
                }
                None => requests_open = false,
            },
        }
    }

    if let Err(e) = writer.close().await {
        debug!(error = %e, "closing daemon link failed");
    }
}

/// Write requests queued before cancellation so a dispatch followed by an
/// immediate shutdown still reaches the daemon.
async fn flush_pending<W: AsyncWrite + Unpin>(
    requests: &mut mpsc::UnboundedReceiver<DaemonRequest>,
    writer: &mut RequestWriter<W>,
) {
    while let Ok(request) = requests.try_recv() {
        if let Err(e) = writer.send(&request).await {
            warn!(error = %e, ?request, "failed to flush request to daemon");
            return;
        }
    }
}

fn apply_logged(registry: &Registry, event: DaemonEvent) {
    let kind = event.kind_str();
    match apply_event(registry, event) {
        Ok(()) => {}
        Err(e) if e.is_not_found() => debug!(event = kind, error = %e, "notification raced a removal"),
        Err(e) => warn!(event = kind, error = %e, "notification not applied"),
    }
}

// ── Notification semantics ───────────────────────────────────────────

/// Apply one daemon notification as a single registry transaction.
pub fn apply_event(registry: &Registry, event: DaemonEvent) -> Result<(), CoreError> {
    match event {
        DaemonEvent::DeviceAdded {
            id,
            kind,
            name,
            strength,
        } => registry.transaction(|txn| {
            txn.upsert_device(&id, kind.into(), &name);
            match strength {
                Some(strength) => txn.set_device_strength(&id, clamp_strength(strength)),
                None => Ok(()),
            }
        }),
        DaemonEvent::DeviceRemoved { id } => {
            registry.remove_device(&id);
            Ok(())
        }
        DaemonEvent::DeviceStrength { id, strength } => {
            registry.transaction(|txn| txn.set_device_strength(&id, clamp_strength(strength)))
        }
        DaemonEvent::ScanResult {
            device_id,
            networks,
        } => registry.apply_scan(
            &device_id,
            networks.into_iter().map(|n| ScanEntry {
                essid: n.essid,
                strength: clamp_strength(n.strength),
                encrypted: n.encrypted,
            }),
        ),
        DaemonEvent::ActiveChanged { device_id, essid } => registry.transaction(|txn| {
            let Some(device_id) = device_id else {
                txn.set_active(None);
                return Ok(());
            };
            if !txn.set_active(Some(&device_id)) {
                return Err(CoreError::device_not_found(&device_id));
            }
            match essid {
                Some(essid) => match txn.set_network_active(&device_id, &essid) {
                    Err(e) if e.is_not_found() => {
                        debug!(device = %device_id, %essid, "active network not in scan list yet");
                        txn.clear_network_active(&device_id)
                    }
                    other => other,
                },
                None => txn.clear_network_active(&device_id),
            }
        }),
        DaemonEvent::StateChanged { state } => {
            registry.set_connectivity(state.into());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nmtray_api::{ConnectivityState as WireState, DeviceKind as WireKind, ScannedNetwork};

    use super::*;
    use crate::model::{ConnectivityState, DeviceKind};

    fn added(id: &str, kind: WireKind) -> DaemonEvent {
        DaemonEvent::DeviceAdded {
            id: id.into(),
            kind,
            name: id.to_uppercase(),
            strength: None,
        }
    }

    fn scanned(essid: &str, strength: i32) -> ScannedNetwork {
        ScannedNetwork {
            essid: essid.into(),
            strength,
            encrypted: false,
        }
    }

    #[test]
    fn device_added_with_strength_is_clamped() {
        let reg = Registry::new();
        apply_event(
            &reg,
            DaemonEvent::DeviceAdded {
                id: "wlan0".into(),
                kind: WireKind::Wireless,
                name: "Wi-Fi".into(),
                strength: Some(140),
            },
        )
        .unwrap();

        let dev = reg.device("wlan0").unwrap();
        assert_eq!(dev.kind, DeviceKind::Wireless);
        assert_eq!(dev.strength, 100);
    }

    #[test]
    fn scan_result_replaces_networks() {
        let reg = Registry::new();
        apply_event(&reg, added("wlan0", WireKind::Wireless)).unwrap();
        apply_event(
            &reg,
            DaemonEvent::ScanResult {
                device_id: "wlan0".into(),
                networks: vec![scanned("a", 10), scanned("b", -5)],
            },
        )
        .unwrap();
        apply_event(
            &reg,
            DaemonEvent::ScanResult {
                device_id: "wlan0".into(),
                networks: vec![scanned("b", 30)],
            },
        )
        .unwrap();

        let dev = reg.device("wlan0").unwrap();
        assert_eq!(dev.networks.len(), 1);
        assert_eq!(dev.network("b").unwrap().strength, 30);
    }

    #[test]
    fn scan_for_unknown_device_is_not_found() {
        let reg = Registry::new();
        let err = apply_event(
            &reg,
            DaemonEvent::ScanResult {
                device_id: "ghost".into(),
                networks: vec![scanned("a", 10)],
            },
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn active_changed_sets_device_and_network() {
        let reg = Registry::new();
        apply_event(&reg, added("wlan0", WireKind::Wireless)).unwrap();
        apply_event(
            &reg,
            DaemonEvent::ScanResult {
                device_id: "wlan0".into(),
                networks: vec![scanned("home", 80), scanned("cafe", 20)],
            },
        )
        .unwrap();
        apply_event(
            &reg,
            DaemonEvent::ActiveChanged {
                device_id: Some("wlan0".into()),
                essid: Some("home".into()),
            },
        )
        .unwrap();

        assert_eq!(reg.active_device_id().unwrap().as_str(), "wlan0");
        assert_eq!(reg.snapshot_active_strength(), Some(80));
    }

    #[test]
    fn active_changed_with_unscanned_essid_clears_flags() {
        let reg = Registry::new();
        apply_event(&reg, added("wlan0", WireKind::Wireless)).unwrap();
        reg.upsert_network("wlan0", "old", 50, false).unwrap();
        reg.set_network_active("wlan0", "old").unwrap();

        apply_event(
            &reg,
            DaemonEvent::ActiveChanged {
                device_id: Some("wlan0".into()),
                essid: Some("new".into()),
            },
        )
        .unwrap();

        let dev = reg.device("wlan0").unwrap();
        assert!(dev.active_network().is_none());
        assert_eq!(reg.active_device_id().unwrap().as_str(), "wlan0");
    }

    #[test]
    fn active_changed_for_unknown_device_keeps_previous() {
        let reg = Registry::new();
        apply_event(&reg, added("eth0", WireKind::Wired)).unwrap();
        apply_event(
            &reg,
            DaemonEvent::ActiveChanged {
                device_id: Some("eth0".into()),
                essid: None,
            },
        )
        .unwrap();

        let err = apply_event(
            &reg,
            DaemonEvent::ActiveChanged {
                device_id: Some("ghost".into()),
                essid: None,
            },
        )
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(reg.active_device_id().unwrap().as_str(), "eth0");
    }

    #[test]
    fn active_changed_without_device_clears_reference() {
        let reg = Registry::new();
        apply_event(&reg, added("eth0", WireKind::Wired)).unwrap();
        reg.set_active(Some("eth0"));
        apply_event(
            &reg,
            DaemonEvent::ActiveChanged {
                device_id: None,
                essid: None,
            },
        )
        .unwrap();
        assert!(reg.active_device_id().is_none());
    }

    #[test]
    fn state_changed_updates_connectivity() {
        let reg = Registry::new();
        apply_event(
            &reg,
            DaemonEvent::StateChanged {
                state: WireState::WirelessScanning,
            },
        )
        .unwrap();
        assert_eq!(reg.connectivity(), ConnectivityState::WirelessScanning);
    }

    #[test]
    fn request_handle_reports_stopped_worker() {
        let (handle, rx) = RequestHandle::channel();
        drop(rx);
        let err = handle
            .send(DaemonRequest::SetActive {
                device_id: "eth0".into(),
                essid: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::DaemonUnavailable { .. }));
    }
}
