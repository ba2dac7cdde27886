// ── Modem session controller ──
//
// Full lifecycle owner for one VARA modem: opens the command channel,
// places and answers calls, and tears everything down on close. Each
// call runs in its own `Session`; once that session has seen
// DISCONNECTED the next dial or accept starts a fresh one.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use vara_api::{Command, EventKind, Request};

use crate::addr::{Addr, NETWORK};
use crate::bus::Subscription;
use crate::config::ModemConfig;
use crate::error::CoreError;
use crate::ptt::{PttBridge, PttController};
use crate::session::Session;
use crate::state::ConnectionState;
use crate::stream::DataStream;

/// Handle to a VARA modem, bound to the local station's call sign.
///
/// Cheaply cloneable; all clones share one command channel.
#[derive(Clone)]
pub struct Modem {
    inner: Arc<ModemInner>,
}

struct ModemInner {
    local: Addr,
    config: ModemConfig,
    ptt: ArcSwap<PttBridge>,
    session: ArcSwapOption<Session>,
    remote: ArcSwapOption<Addr>,
    /// Serializes session creation so clones never open two command channels.
    start_lock: Mutex<()>,
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("local", &self.inner.local)
            .field("host", &self.inner.config.host)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Modem {
    /// Create a handle for `my_call`. No connection is made until
    /// [`start`](Self::start), [`dial`](Self::dial) or [`accept`](Self::accept).
    pub fn new(my_call: &str, config: ModemConfig) -> Result<Self, CoreError> {
        Ok(Self {
            inner: Arc::new(ModemInner {
                local: Addr::new(my_call)?,
                config,
                ptt: ArcSwap::from_pointee(PttBridge::default()),
                session: ArcSwapOption::empty(),
                remote: ArcSwapOption::empty(),
                start_lock: Mutex::new(()),
            }),
        })
    }

    /// Attach the controller that keys the transmitter on `PTT ON/OFF`.
    ///
    /// Takes effect for the next session started.
    pub fn set_ptt(&self, rig: Arc<dyn PttController>) {
        self.inner.ptt.store(Arc::new(PttBridge::new(Some(rig))));
    }

    pub fn config(&self) -> &ModemConfig {
        &self.inner.config
    }

    // ── Observation ──────────────────────────────────────────────────

    /// The local station's address.
    pub fn local_addr(&self) -> &Addr {
        &self.inner.local
    }

    /// The remote station of the current connection, if any.
    pub fn remote_addr(&self) -> Option<Addr> {
        self.inner.remote.load_full().map(|addr| (*addr).clone())
    }

    pub fn network(&self) -> &'static str {
        NETWORK
    }

    /// Connection state of the current session.
    pub fn state(&self) -> ConnectionState {
        self.inner
            .session
            .load_full()
            .map_or(ConnectionState::Disconnected, |s| s.state.current())
    }

    /// Whether the modem last reported the channel as occupied.
    pub fn busy(&self) -> bool {
        self.inner
            .session
            .load_full()
            .is_some_and(|s| s.is_busy())
    }

    /// Subscribe to command events of the running session.
    ///
    /// `None` if no session is running; call [`start`](Self::start) first.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Option<Subscription> {
        self.inner
            .session
            .load_full()
            .filter(|s| !s.is_terminated())
            .map(|s| s.subscribe(kinds))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the command channel without placing or awaiting a call.
    ///
    /// Useful for monitoring channel activity. A no-op if a session is
    /// already running.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.session().await.map(|_| ())
    }

    /// Place an outbound call to `target`.
    pub async fn dial(&self, target: &str) -> Result<DataStream, CoreError> {
        let remote = Addr::new(target)?;
        self.dial_addr(remote).await
    }

    /// Place an outbound call to the station named in a `vara:///CALL` URL.
    pub async fn dial_url(&self, url: &Url) -> Result<DataStream, CoreError> {
        let remote = Addr::from_url(url)?;
        self.dial_addr(remote).await
    }

    /// Listen for and return the next inbound connection.
    ///
    /// Waits until a remote station connects or the session ends.
    pub async fn accept(&self) -> Result<DataStream, CoreError> {
        if self.state() == ConnectionState::Connected {
            return Err(CoreError::AlreadyConnected);
        }
        let session = self.session().await?;

        let result = self.answer(&session).await;
        self.finish(session, result).await
    }

    /// Abort any connection and close the command channel.
    ///
    /// Sends `ABORT` and waits for the modem to report `DISCONNECTED`, then
    /// releases PTT and forgets the session.
    ///
    /// The wait is bounded by [`ModemConfig::disconnect_timeout`] rather
    /// than indefinite, so a hung modem cannot wedge shutdown. On expiry
    /// the session is still torn down and PTT released, and
    /// [`CoreError::DisconnectTimeout`] is returned.
    pub async fn close(&self) -> Result<(), CoreError> {
        let session = self.inner.session.swap(None);
        self.inner.remote.store(None);

        let mut result = Ok(());
        if let Some(session) = session {
            if !session.is_terminated() {
                if let Err(e) = session.send(Request::Abort).await {
                    debug!(error = %e, "could not send ABORT");
                }
                if session.state.is_connected() {
                    let timeout = session.config.disconnect_timeout;
                    let waited = tokio::time::timeout(
                        timeout,
                        session.state.wait_for(ConnectionState::Disconnected),
                    )
                    .await;
                    if waited.is_err() {
                        warn!(
                            timeout_secs = timeout.as_secs(),
                            "modem did not confirm abort, closing anyway"
                        );
                        result = Err(CoreError::DisconnectTimeout {
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                }
            }
            session.shutdown().await;
            info!("modem closed");
        }

        self.inner.ptt.load().release();
        result
    }

    // ── Internals ────────────────────────────────────────────────────

    /// The running session, starting one if there is none (or the last
    /// one has ended).
    async fn session(&self) -> Result<Arc<Session>, CoreError> {
        let _guard = self.inner.start_lock.lock().await;

        if let Some(session) = self.inner.session.load_full() {
            if !session.is_terminated() {
                return Ok(session);
            }
        }

        let ptt = PttBridge::clone(&self.inner.ptt.load());
        let session = Session::start(&self.inner.config, ptt).await?;
        self.inner.session.store(Some(Arc::clone(&session)));
        self.inner.remote.store(None);
        Ok(session)
    }

    async fn dial_addr(&self, remote: Addr) -> Result<DataStream, CoreError> {
        if self.state() == ConnectionState::Connected {
            return Err(CoreError::AlreadyConnected);
        }
        let session = self.session().await?;

        let result = self.call(&session, remote).await;
        self.finish(session, result).await
    }

    async fn call(&self, session: &Session, remote: Addr) -> Result<Addr, CoreError> {
        let local = &self.inner.local;
        session.open_data().await?;

        // Subscribe before CONNECT so the answer cannot slip past us.
        let mut events = session.subscribe(&[EventKind::Connected]);
        session.send(Request::MyCall(local.call().into())).await?;
        session.send(Request::Listen(false)).await?;
        session
            .send(Request::Connect {
                source: local.call().into(),
                target: remote.call().into(),
            })
            .await?;
        info!(%remote, "dialing");

        let timeout = session.config.dial_timeout;
        match tokio::time::timeout(timeout, next_connected(&mut events)).await {
            Ok(Some(_)) => Ok(remote),
            Ok(None) => Err(CoreError::ConnectFailed {
                remote: remote.to_string(),
            }),
            Err(_) => Err(CoreError::Timeout {
                operation: "connect",
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn answer(&self, session: &Session) -> Result<Addr, CoreError> {
        let local = &self.inner.local;
        session.open_data().await?;

        let mut events = session.subscribe(&[EventKind::Connected]);
        session.send(Request::MyCall(local.call().into())).await?;
        session.send(Request::Listen(true)).await?;
        info!(%local, "listening for inbound connections");

        match next_connected(&mut events).await {
            Some(Command::Connected { source, .. }) => {
                Ok(Addr::peer(source.as_deref().unwrap_or_default()))
            }
            _ => Err(CoreError::ConnectFailed {
                remote: "inbound".into(),
            }),
        }
    }

    /// Turn a connection attempt into a stream, or abort the session.
    async fn finish(
        &self,
        session: Arc<Session>,
        result: Result<Addr, CoreError>,
    ) -> Result<DataStream, CoreError> {
        match result {
            Ok(remote) => {
                info!(%remote, "connected");
                self.inner.remote.store(Some(Arc::new(remote.clone())));
                Ok(DataStream::new(session, self.inner.local.clone(), remote))
            }
            Err(e) => {
                debug!(error = %e, "connection attempt failed, aborting session");
                session.abort().await;
                Err(e)
            }
        }
    }
}

/// Wait for the session's `CONNECTED` event; `None` if it ends first.
async fn next_connected(events: &mut Subscription) -> Option<Command> {
    while let Some(cmd) = events.recv().await {
        match cmd {
            Command::Connected { .. } => return Some(cmd),
            Command::Disconnected => return None,
            _ => {}
        }
    }
    None
}
