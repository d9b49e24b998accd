// Shared helpers for nmtray-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use nmtray_api::{EventReader, RequestWriter, from_halves};
use nmtray_core::{Connector, DisplayView, Presenter, Registry};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

// ── In-memory daemon link ───────────────────────────────────────────

/// Hands out the client end of a `tokio::io::duplex` pipe, once.
pub struct DuplexConnector {
    stream: Mutex<Option<DuplexStream>>,
}

impl Connector for DuplexConnector {
    type Read = ReadHalf<DuplexStream>;
    type Write = WriteHalf<DuplexStream>;

    async fn connect(
        &self,
    ) -> Result<(EventReader<Self::Read>, RequestWriter<Self::Write>), nmtray_api::Error> {
        let stream = self
            .stream
            .lock()
            .unwrap()
            .take()
            .ok_or(nmtray_api::Error::Closed)?;
        let (read, write) = tokio::io::split(stream);
        Ok(from_halves(read, write))
    }
}

/// Always fails, like a missing daemon socket.
pub struct RefusingConnector;

impl Connector for RefusingConnector {
    type Read = ReadHalf<DuplexStream>;
    type Write = WriteHalf<DuplexStream>;

    async fn connect(
        &self,
    ) -> Result<(EventReader<Self::Read>, RequestWriter<Self::Write>), nmtray_api::Error> {
        Err(nmtray_api::Error::Connect {
            path: "/nonexistent/daemon.sock".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

/// A connector for the worker plus the daemon's end of the pipe.
pub fn daemon_link() -> (DuplexConnector, DuplexStream) {
    let (client, daemon) = tokio::io::duplex(64 * 1024);
    (
        DuplexConnector {
            stream: Mutex::new(Some(client)),
        },
        daemon,
    )
}

/// Write notification lines as the daemon would.
pub async fn send_lines(daemon: &mut DuplexStream, lines: &[&str]) {
    for line in lines {
        daemon.write_all(line.as_bytes()).await.unwrap();
        daemon.write_all(b"\n").await.unwrap();
    }
    daemon.flush().await.unwrap();
}

// ── Waiting on the registry ─────────────────────────────────────────

/// Wait until `pred` holds, re-checking after every committed change.
pub async fn wait_for(registry: &Registry, pred: impl Fn(&Registry) -> bool) {
    let mut versions = registry.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(registry) {
                return;
            }
            versions.changed().await.unwrap();
        }
    })
    .await
    .expect("registry never reached the expected state");
}

// ── Recording presenter ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct Recorder {
    views: Arc<Mutex<Vec<DisplayView>>>,
}

impl Recorder {
    pub fn last(&self) -> DisplayView {
        *self.views.lock().unwrap().last().expect("nothing rendered yet")
    }

    pub fn len(&self) -> usize {
        self.views.lock().unwrap().len()
    }

    pub fn since(&self, index: usize) -> Vec<DisplayView> {
        self.views.lock().unwrap()[index..].to_vec()
    }
}

impl Presenter for Recorder {
    fn render(&mut self, view: &DisplayView) {
        self.views.lock().unwrap().push(*view);
    }
}
