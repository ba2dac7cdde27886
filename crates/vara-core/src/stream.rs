// ── Flow-controlled data stream ──
//
// Byte-stream view of one established VARA connection. Reads come
// straight off the data channel. Writes are paced against the modem's
// `BUFFER` reports so the application never queues more than the radio
// link can drain within a reasonable time.
//
// One reader and one writer may run concurrently; `close` may be called
// from any task, any number of times.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vara_api::{Command, EventKind, Request};

use crate::addr::Addr;
use crate::bus::Subscription;
use crate::error::CoreError;
use crate::session::Session;

/// Result of the first (and only) close attempt, replayed to later callers.
#[derive(Debug, Clone, Copy)]
enum CloseOutcome {
    Closed,
    TimedOut { timeout_secs: u64 },
}

/// An established connection to a remote station.
///
/// Returned by [`Modem::dial`](crate::Modem::dial) and
/// [`Modem::accept`](crate::Modem::accept).
pub struct DataStream {
    session: Arc<Session>,
    local: Addr,
    remote: Addr,
    closing: AtomicBool,
    disconnect_sent: AtomicBool,
    close_outcome: OnceCell<CloseOutcome>,
}

impl std::fmt::Debug for DataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStream")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("closing", &self.is_closing())
            .finish_non_exhaustive()
    }
}

impl DataStream {
    pub(crate) fn new(session: Arc<Session>, local: Addr, remote: Addr) -> Self {
        Self {
            session,
            local,
            remote,
            closing: AtomicBool::new(false),
            disconnect_sent: AtomicBool::new(false),
            close_outcome: OnceCell::new(),
        }
    }

    pub fn local_addr(&self) -> &Addr {
        &self.local
    }

    pub fn remote_addr(&self) -> &Addr {
        &self.remote
    }

    /// Bytes the modem still has queued for transmission, as last reported.
    pub fn tx_buffer_len(&self) -> usize {
        self.session.buffer.get()
    }

    /// `true` once [`close`](Self::close) has been called.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// Read received bytes into `buf`.
    ///
    /// Returns `Ok(0)` when the connection is over, including when it ends
    /// while this call is waiting. Only one read may be in flight at a time.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, CoreError> {
        let session = &self.session;
        let mut events = session.subscribe(&[]);

        if !session.state.is_connected() {
            debug!("read: not connected");
            return Ok(0);
        }

        tokio::select! {
            res = session.data.read(buf) => match res {
                Ok(n) => Ok(n),
                Err(e) => {
                    debug!(error = %e, "read: data channel error");
                    Err(e.into())
                }
            },
            () = events.disconnected() => {
                debug!("read: disconnected while waiting for data");
                Ok(0)
            }
        }
    }

    // ── Write ────────────────────────────────────────────────────────

    /// Queue `buf` for transmission, waiting for the modem to drain if
    /// too much is already outstanding.
    ///
    /// The write proceeds only once the reported backlog is below
    /// `write_pacing × buf.len()`. Each `BUFFER` report restarts the
    /// inactivity timeout. Writing an empty slice is a no-op.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, CoreError> {
        let session = &self.session;
        let mut events = session.subscribe(&[EventKind::Buffer]);

        if !session.state.is_connected() {
            return Err(CoreError::EndOfStream);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let timeout = session.config.buffer_timeout;
        let threshold = session.config.write_pacing.max(1).saturating_mul(buf.len());
        let mut count = session.buffer.get();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        while count >= threshold && !self.is_closing() {
            debug!(count, threshold, "write: modem buffer full, waiting");
            tokio::select! {
                event = events.recv() => match event {
                    Some(Command::Buffer(n)) => {
                        count = n;
                        deadline.as_mut().reset(Instant::now() + timeout);
                    }
                    Some(Command::Disconnected) | None => return Err(CoreError::EndOfStream),
                    Some(_) => {}
                },
                () = &mut deadline => return Err(buffer_timeout("write", timeout)),
            }
        }

        if self.is_closing() && session.state.is_connected() {
            // Hold the bytes back; the link is on its way down.
            debug!("write: close in progress, waiting for disconnect");
            events.disconnected().await;
            return Err(CoreError::EndOfStream);
        }

        session.buffer.incr(buf.len());
        tokio::select! {
            biased;
            () = session.cancelled() => Err(CoreError::EndOfStream),
            res = session.data.write_all(buf) => {
                res?;
                Ok(buf.len())
            }
        }
    }

    // ── Flush ────────────────────────────────────────────────────────

    /// Wait until the modem reports an empty transmit buffer.
    ///
    /// Returns immediately once the stream is closing.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let session = &self.session;
        let mut events = session.subscribe(&[EventKind::Buffer]);

        if self.is_closing() {
            return Ok(());
        }

        let timeout = session.config.buffer_timeout;
        let mut count = session.buffer.get();

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        while count > 0 {
            debug!(count, "flush: waiting for modem to drain");
            tokio::select! {
                event = events.recv() => match event {
                    Some(Command::Buffer(n)) => {
                        count = n;
                        deadline.as_mut().reset(Instant::now() + timeout);
                    }
                    Some(Command::Disconnected) | None => return Err(CoreError::EndOfStream),
                    Some(_) => {}
                },
                () = &mut deadline => return Err(buffer_timeout("flush", timeout)),
            }
        }
        Ok(())
    }

    // ── Close ────────────────────────────────────────────────────────

    /// Gracefully disconnect from the remote station.
    ///
    /// Sends `DISCONNECT` and waits for the modem to confirm. If it does
    /// not within the disconnect timeout the session is aborted and
    /// [`CoreError::DisconnectTimeout`] is returned. Concurrent and
    /// repeated calls share the first completed call's outcome. A close
    /// that is dropped mid-flight records nothing, but `DISCONNECT` is
    /// still sent at most once: a retry just resumes waiting.
    pub async fn close(&self) -> Result<(), CoreError> {
        let outcome = *self.close_outcome.get_or_init(|| self.disconnect()).await;
        match outcome {
            CloseOutcome::Closed => Ok(()),
            CloseOutcome::TimedOut { timeout_secs } => {
                Err(CoreError::DisconnectTimeout { timeout_secs })
            }
        }
    }

    async fn disconnect(&self) -> CloseOutcome {
        let session = &self.session;
        if session.is_terminated() {
            return CloseOutcome::Closed;
        }

        self.closing.store(true, Ordering::Release);
        let mut events = session.subscribe(&[]);

        if !session.state.is_connected() {
            return CloseOutcome::Closed;
        }

        if !self.disconnect_sent.swap(true, Ordering::AcqRel) {
            info!(remote = %self.remote, "disconnecting");
            if let Err(e) = session.send(Request::Disconnect).await {
                debug!(error = %e, "could not send DISCONNECT");
            }
        }

        let timeout = session.config.disconnect_timeout;
        if tokio::time::timeout(timeout, events.disconnected()).await.is_ok() {
            return CloseOutcome::Closed;
        }

        warn!(
            remote = %self.remote,
            timeout_secs = timeout.as_secs(),
            "disconnect timeout, aborting connection"
        );
        session.abort().await;
        CloseOutcome::TimedOut {
            timeout_secs: timeout.as_secs(),
        }
    }

    /// Subscribe to this connection's command events.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        self.session.subscribe(kinds)
    }
}

fn buffer_timeout(operation: &'static str, timeout: Duration) -> CoreError {
    CoreError::BufferTimeout {
        operation,
        timeout_secs: timeout.as_secs(),
    }
}
