#![allow(clippy::unwrap_used, dead_code)]
// Scripted stand-in for the VARA modem program: two localhost listeners
// (command + data) and a handle for driving each accepted session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use vara_core::{DataStream, Modem, ModemConfig, PttController, PttError};

const STEP: Duration = Duration::from_secs(2);

// ── Mock modem ──────────────────────────────────────────────────────

pub struct MockModem {
    cmd: TcpListener,
    data: TcpListener,
}

impl MockModem {
    pub async fn bind() -> Self {
        Self {
            cmd: TcpListener::bind("127.0.0.1:0").await.unwrap(),
            data: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    /// Client config pointing at this mock, with timeouts short enough for tests.
    pub fn config(&self) -> ModemConfig {
        ModemConfig {
            host: "127.0.0.1".into(),
            cmd_port: self.cmd.local_addr().unwrap().port(),
            data_port: self.data.local_addr().unwrap().port(),
            connect_timeout: STEP,
            dial_timeout: STEP,
            buffer_timeout: STEP,
            disconnect_timeout: STEP,
            ..ModemConfig::default()
        }
    }

    pub fn modem(&self) -> Modem {
        Modem::new("N0CALL", self.config()).unwrap()
    }

    pub async fn accept_command(&self) -> Link {
        let (stream, _) = tokio::time::timeout(STEP, self.cmd.accept())
            .await
            .unwrap()
            .unwrap();
        let (read, write) = stream.into_split();
        Link {
            cmd: BufReader::new(read),
            cmd_tx: write,
            data: None,
        }
    }

    pub async fn accept_data(&self, link: &mut Link) {
        let (stream, _) = tokio::time::timeout(STEP, self.data.accept())
            .await
            .unwrap()
            .unwrap();
        link.data = Some(stream);
    }

    /// Accept both channels of a fresh session.
    pub async fn accept(&self) -> Link {
        let mut link = self.accept_command().await;
        self.accept_data(&mut link).await;
        link
    }
}

// ── One accepted session ────────────────────────────────────────────

pub struct Link {
    cmd: BufReader<OwnedReadHalf>,
    cmd_tx: OwnedWriteHalf,
    data: Option<TcpStream>,
}

impl Link {
    /// Next `\r`-terminated record from the client, `None` on EOF.
    pub async fn next_record(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(STEP, self.cmd.read_until(b'\r', &mut buf))
            .await
            .unwrap()
            .unwrap();
        if n == 0 {
            return None;
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Some(String::from_utf8(buf).unwrap())
    }

    pub async fn expect(&mut self, want: &str) {
        assert_eq!(self.next_record().await.as_deref(), Some(want));
    }

    /// The client closed the command channel without sending anything else.
    pub async fn expect_closed(&mut self) {
        assert_eq!(self.next_record().await, None);
    }

    pub async fn send(&mut self, record: &str) {
        self.cmd_tx
            .write_all(format!("{record}\r").as_bytes())
            .await
            .unwrap();
    }

    pub async fn read_data(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        let data = self.data.as_mut().unwrap();
        tokio::time::timeout(STEP, data.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf
    }

    pub async fn write_data(&mut self, bytes: &[u8]) {
        self.data.as_mut().unwrap().write_all(bytes).await.unwrap();
    }

    /// Hang up the command channel, keeping the data channel open.
    pub fn drop_command(self) -> Option<TcpStream> {
        self.data
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

/// Dial W1AW from N0CALL and complete the handshake.
pub async fn dial(mock: &MockModem, modem: &Modem) -> (DataStream, Link) {
    let dialer = {
        let modem = modem.clone();
        tokio::spawn(async move { modem.dial("w1aw").await })
    };

    let mut link = mock.accept().await;
    link.expect("MYCALL N0CALL").await;
    link.expect("LISTEN OFF").await;
    link.expect("CONNECT N0CALL W1AW").await;
    link.send("CONNECTED N0CALL W1AW").await;

    let stream = dialer.await.unwrap().unwrap();
    (stream, link)
}

/// Poll `check` until it holds, failing the test after a short while.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + STEP;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── PTT recorder ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingRig {
    calls: Mutex<Vec<bool>>,
}

impl RecordingRig {
    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

impl PttController for RecordingRig {
    fn set_ptt(&self, on: bool) -> Result<(), PttError> {
        self.calls.lock().unwrap().push(on);
        Ok(())
    }
}

pub fn recording_rig() -> (Arc<RecordingRig>, Arc<dyn PttController>) {
    let rig = Arc::new(RecordingRig::default());
    let controller: Arc<dyn PttController> = rig.clone();
    (rig, controller)
}
