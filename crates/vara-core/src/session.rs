// ── Per-connection session engine ──
//
// One session = one command-channel connection to the modem, the task
// that consumes it, and (once dialing or listening) one data channel.
// The command loop is the only producer of events and the only writer
// of connection state; everything else coordinates through the bus.
//
// Teardown order matters: state goes terminal first, then the bus
// broadcasts the terminal event (waking every blocked reader, writer,
// flusher and closer), then in-flight data I/O is cancelled and both
// channels are closed.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use vara_api::transport::{CommandReader, CommandWriter};
use vara_api::{Command, EventKind, Request};

use crate::buffer::BufferCount;
use crate::bus::{EventBus, Subscription};
use crate::config::ModemConfig;
use crate::error::CoreError;
use crate::ptt::PttBridge;
use crate::state::{StateMachine, Transition};

pub(crate) struct Session {
    pub(crate) config: ModemConfig,
    pub(crate) bus: EventBus,
    pub(crate) state: StateMachine,
    pub(crate) buffer: BufferCount,
    pub(crate) data: DataChannel,
    busy: AtomicBool,
    ptt: PttBridge,
    commands: Mutex<Option<CommandWriter>>,
    /// Requests teardown and interrupts in-flight channel I/O.
    cancel: CancellationToken,
    /// Fired once teardown has finished.
    done: CancellationToken,
}

impl Session {
    /// Open the command channel and launch the command loop.
    pub(crate) async fn start(config: &ModemConfig, ptt: PttBridge) -> Result<Arc<Self>, CoreError> {
        let (reader, writer) = config.transport().connect_command(config.cmd_port).await?;
        info!(host = %config.host, port = config.cmd_port, "command channel open");
        Ok(Self::spawn(config.clone(), ptt, reader, writer))
    }

    fn spawn(
        config: ModemConfig,
        ptt: PttBridge,
        reader: CommandReader,
        writer: CommandWriter,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            bus: EventBus::new(config.event_capacity),
            config,
            state: StateMachine::new(),
            buffer: BufferCount::new(),
            data: DataChannel::default(),
            busy: AtomicBool::new(false),
            ptt,
            commands: Mutex::new(Some(writer)),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        });

        tokio::spawn(command_loop(Arc::clone(&session), reader));
        session
    }

    // ── Accessors ────────────────────────────────────────────────

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    pub(crate) fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        self.bus.subscribe(kinds)
    }

    /// Resolves once teardown has completed.
    pub(crate) async fn closed(&self) {
        self.done.cancelled().await;
    }

    /// Resolves as soon as teardown has been requested.
    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    // ── Channels ─────────────────────────────────────────────────

    /// Connect the data channel for the upcoming connection.
    pub(crate) async fn open_data(&self) -> Result<(), CoreError> {
        let stream = self
            .config
            .transport()
            .connect("data", self.config.data_port)
            .await?;
        self.data.attach(stream).await;
        debug!(port = self.config.data_port, "data channel open");
        Ok(())
    }

    /// Send one command record. Fire-and-forget from the protocol's
    /// point of view; fails only if the channel is gone.
    pub(crate) async fn send(&self, req: Request) -> Result<(), CoreError> {
        if self.config.debug {
            info!(command = %req, "-> modem");
        } else {
            trace!(command = %req, "-> modem");
        }

        let mut guard = self.commands.lock().await;
        let writer = guard.as_mut().ok_or(vara_api::Error::ChannelClosed)?;
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(vara_api::Error::ChannelClosed.into()),
            res = writer.send(req) => res.map_err(CoreError::from),
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Tear down without waiting for the modem: best-effort `ABORT`,
    /// then stop the loop and wait until the session is terminal.
    pub(crate) async fn abort(&self) {
        if !self.is_terminated() {
            if let Err(e) = self.send(Request::Abort).await {
                debug!(error = %e, "could not send ABORT");
            }
        }
        self.shutdown().await;
    }

    /// Stop the command loop and wait for teardown to finish.
    pub(crate) async fn shutdown(&self) {
        self.cancel.cancel();
        self.closed().await;
    }

    async fn teardown(&self) {
        if self.state.terminate().is_some() {
            info!("session disconnected");
        }
        self.bus.close();
        self.cancel.cancel();
        self.data.close().await;
        if let Some(mut writer) = self.commands.lock().await.take() {
            if let Err(e) = writer.close().await {
                trace!(error = %e, "command channel close failed");
            }
        }
        self.done.cancel();
        debug!("session torn down");
    }

    // ── Event handling ───────────────────────────────────────────

    /// Apply one inbound record. Returns `true` when the session is over.
    fn dispatch(&self, cmd: &Command) -> bool {
        if self.config.debug {
            info!(command = %cmd, "<- modem");
        } else {
            trace!(command = %cmd, "<- modem");
        }

        match cmd {
            Command::PttOn | Command::PttOff => self.ptt.handle(cmd),
            Command::BusyOn => self.busy.store(true, Ordering::Release),
            Command::BusyOff => self.busy.store(false, Ordering::Release),
            Command::Buffer(n) => self.buffer.set(*n),
            Command::Unknown(raw) => warn!(record = %raw, "unexpected command from modem"),
            Command::Connected { .. } | Command::Disconnected | Command::Ok | Command::Alive => {}
        }

        match self.state.apply(cmd) {
            Some(Transition::Connected) => info!(%cmd, "link established"),
            // The bus gets its terminal broadcast during teardown.
            Some(Transition::Disconnected) => return true,
            None => {}
        }
        if cmd.is_disconnected() {
            return true;
        }

        self.bus.publish(cmd);
        false
    }
}

// ── Command loop ─────────────────────────────────────────────────────

async fn command_loop(session: Arc<Session>, mut reader: CommandReader) {
    loop {
        tokio::select! {
            biased;
            () = session.cancel.cancelled() => {
                debug!("command loop cancelled");
                break;
            }
            frame = reader.next() => match frame {
                Some(Ok(cmd)) => {
                    if session.dispatch(&cmd) {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "command channel failed");
                    break;
                }
                None => {
                    info!("command channel closed by modem");
                    break;
                }
            }
        }
    }

    session.teardown().await;
}

// ── Data channel ─────────────────────────────────────────────────────

/// Raw payload connection, split so one reader and one writer can use
/// it concurrently.
#[derive(Default)]
pub(crate) struct DataChannel {
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl DataChannel {
    async fn attach(&self, stream: TcpStream) {
        let (read, write) = stream.into_split();
        *self.reader.lock().await = Some(read);
        *self.writer.lock().await = Some(write);
    }

    /// Read into `buf`; `Ok(0)` once the channel has been closed.
    pub(crate) async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut guard = self.reader.lock().await;
        match guard.as_mut() {
            Some(read) => read.read(buf).await,
            None => Ok(0),
        }
    }

    pub(crate) async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(write) => write.write_all(buf).await,
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    async fn close(&self) {
        self.reader.lock().await.take();
        if let Some(mut write) = self.writer.lock().await.take() {
            let _ = write.shutdown().await;
        }
    }
}
