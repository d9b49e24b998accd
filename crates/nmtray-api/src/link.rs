//! Daemon link: a line-oriented reader and writer over any byte stream.
//!
//! Production code connects to the daemon's Unix socket with [`connect`].
//! Tests build a link from `tokio::io::duplex` halves with [`from_halves`].

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::Error;
use crate::wire::{DaemonEvent, DaemonRequest, encode_request, parse_event};

const SOCKET_DIR: &str = "nmtray";
const SOCKET_NAME: &str = "daemon.sock";
const FALLBACK_RUNTIME_DIR: &str = "/run";

/// Resolve the default daemon socket path.
///
/// `$XDG_RUNTIME_DIR/nmtray/daemon.sock`, or `/run/nmtray/daemon.sock` when
/// no runtime dir is set.
pub fn default_socket_path() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(FALLBACK_RUNTIME_DIR), PathBuf::from);
    base.join(SOCKET_DIR).join(SOCKET_NAME)
}

/// Connect to the daemon socket and split it into reader and writer halves.
pub async fn connect(
    path: &Path,
) -> Result<(EventReader<OwnedReadHalf>, RequestWriter<OwnedWriteHalf>), Error> {
    tracing::debug!(path = %path.display(), "connecting to daemon socket");

    let stream = UnixStream::connect(path)
        .await
        .map_err(|source| Error::Connect {
            path: path.to_path_buf(),
            source,
        })?;
    let (read, write) = stream.into_split();

    tracing::info!(path = %path.display(), "daemon socket connected");
    Ok(from_halves(read, write))
}

/// Build a link from arbitrary stream halves.
pub fn from_halves<R, W>(read: R, write: W) -> (EventReader<R>, RequestWriter<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (EventReader::new(read), RequestWriter::new(write))
}

// ── EventReader ──────────────────────────────────────────────────────

/// Longest notification line accepted, excluding the newline.
pub const MAX_LINE_BYTES: usize = 256 * 1024;

/// Inbound half of a daemon link.
pub struct EventReader<R> {
    reader: BufReader<R>,
    /// Bytes of the line being read. Survives a cancelled read.
    buf: Vec<u8>,
    /// Dropping the rest of an over-long line.
    discarding: bool,
}

impl<R: AsyncRead + Unpin> EventReader<R> {
    pub fn new(read: R) -> Self {
        Self {
            reader: BufReader::new(read),
            buf: Vec::new(),
            discarding: false,
        }
    }

    /// Read the next notification.
    ///
    /// - `Ok(Some(event))`: a decoded notification.
    /// - `Ok(None)`: the daemon closed the stream.
    /// - `Err(MalformedEvent)`: a bad line (invalid JSON, invalid UTF-8 or
    ///   longer than [`MAX_LINE_BYTES`]); the reader stays usable.
    /// - any other `Err`: the link is dead.
    ///
    /// Blank lines are skipped. Cancel-safe: partially read bytes stay in
    /// the reader and the next call picks up where this one stopped.
    pub async fn next_event(&mut self) -> Result<Option<DaemonEvent>, Error> {
        loop {
            let Some(bytes) = self.next_line().await? else {
                return Ok(None);
            };
            let line = String::from_utf8(bytes).map_err(|e| Error::MalformedEvent {
                message: format!("invalid UTF-8: {}", e.utf8_error()),
                line: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            tracing::trace!(line = %line, "daemon notification");
            return parse_event(&line).map(Some);
        }
    }

    /// Next raw line without its newline. A final unterminated line is
    /// returned as-is at end of stream.
    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, Error> {
        loop {
            // `buf` never holds more than MAX_LINE_BYTES between calls.
            let limit = u64::try_from(MAX_LINE_BYTES + 1 - self.buf.len()).unwrap_or(u64::MAX);
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await?;
            let terminated = self.buf.last() == Some(&b'\n');

            if self.discarding {
                self.buf.clear();
                if terminated {
                    self.discarding = false;
                } else if read == 0 {
                    return Ok(None);
                }
                continue;
            }

            if terminated {
                self.buf.pop();
                return Ok(Some(std::mem::take(&mut self.buf)));
            }
            if read == 0 && self.buf.is_empty() {
                return Ok(None);
            }
            if self.buf.len() > MAX_LINE_BYTES {
                self.buf.clear();
                self.discarding = true;
                return Err(Error::MalformedEvent {
                    message: format!("line longer than {MAX_LINE_BYTES} bytes"),
                    line: String::new(),
                });
            }
            // End of stream after an unterminated line.
            return Ok(Some(std::mem::take(&mut self.buf)));
        }
    }
}

// ── RequestWriter ────────────────────────────────────────────────────

/// Outbound half of a daemon link.
pub struct RequestWriter<W> {
    write: W,
}

impl<W: AsyncWrite + Unpin> RequestWriter<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }

    /// Write one request and flush it.
    pub async fn send(&mut self, request: &DaemonRequest) -> Result<(), Error> {
        let line = encode_request(request)?;
        self.write.write_all(line.as_bytes()).await?;
        self.write.flush().await?;
        Ok(())
    }

    /// Flush and shut down the write side.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.write.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::wire::ConnectivityState;

    #[tokio::test]
    async fn reader_skips_blank_lines() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);

        server
            .write_all(b"\n   \n{\"event\":\"state_changed\",\"state\":\"wired\"}\n")
            .await
            .unwrap();

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(
            event,
            DaemonEvent::StateChanged {
                state: ConnectivityState::Wired
            }
        );
    }

    #[tokio::test]
    async fn reader_survives_malformed_line() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);

        server
            .write_all(b"{oops\n{\"event\":\"device_removed\",\"id\":\"eth0\"}\n")
            .await
            .unwrap();

        let err = reader.next_event().await.unwrap_err();
        assert!(!err.is_fatal());

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(event, DaemonEvent::DeviceRemoved { id: "eth0".into() });
    }

    #[tokio::test]
    async fn reader_survives_invalid_utf8_line() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);

        server
            .write_all(b"{\"event\":\"device_removed\",\"id\":\"\xff\xfe\"}\n")
            .await
            .unwrap();
        server
            .write_all(b"{\"event\":\"device_removed\",\"id\":\"eth0\"}\n")
            .await
            .unwrap();

        let err = reader.next_event().await.unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { .. }));
        assert!(!err.is_fatal());

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(event, DaemonEvent::DeviceRemoved { id: "eth0".into() });
    }

    #[tokio::test]
    async fn reader_drops_over_long_line() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);

        let writer = tokio::spawn(async move {
            server.write_all(&vec![b'x'; MAX_LINE_BYTES + 10]).await.unwrap();
            server
                .write_all(b"\n{\"event\":\"device_removed\",\"id\":\"eth0\"}\n")
                .await
                .unwrap();
            server
        });

        let err = reader.next_event().await.unwrap_err();
        assert!(!err.is_fatal());

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(event, DaemonEvent::DeviceRemoved { id: "eth0".into() });
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn reader_returns_unterminated_last_line() {
        let (client, mut server) = tokio::io::duplex(1024);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);

        server
            .write_all(b"{\"event\":\"device_removed\",\"id\":\"eth0\"}")
            .await
            .unwrap();
        drop(server);

        let event = reader.next_event().await.unwrap().unwrap();
        assert_eq!(event, DaemonEvent::DeviceRemoved { id: "eth0".into() });
        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reader_reports_eof() {
        let (client, server) = tokio::io::duplex(64);
        let (read, _write) = tokio::io::split(client);
        let mut reader = EventReader::new(read);
        drop(server);

        assert!(reader.next_event().await.unwrap().is_none());
    }

    #[test]
    fn default_socket_path_ends_with_socket_name() {
        let path = default_socket_path();
        assert!(path.ends_with("nmtray/daemon.sock"));
    }
}
