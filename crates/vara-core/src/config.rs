// ── Runtime modem configuration ──
//
// Describes *how* to reach a VARA modem and how patiently to wait on it.
// Never touches disk: the CLI (via vara-config) builds a `ModemConfig`
// and hands it in.

use std::time::Duration;

use vara_api::TransportConfig;

/// Pacing factor for [`DataStream::write`](crate::DataStream::write).
///
/// A write of `n` bytes blocks while the modem reports at least
/// `WRITE_PACING * n` bytes queued. Tuned by hand against VARA HF and
/// VARA FM; the on-air frame size and `BUFFER` cadence are undocumented,
/// so re-validate before relying on it for another modem.
pub const WRITE_PACING: usize = 7;

/// Configuration for one modem instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemConfig {
    /// Host running the modem program.
    pub host: String,
    /// TCP port of the command channel.
    pub cmd_port: u16,
    /// TCP port of the data channel.
    pub data_port: u16,
    /// Upper bound on opening either TCP channel.
    pub connect_timeout: Duration,
    /// How long an outbound call may take before it is aborted.
    pub dial_timeout: Duration,
    /// Inactivity bound on waiting for a `BUFFER` update in write/flush.
    pub buffer_timeout: Duration,
    /// How long a graceful stream close waits for `DISCONNECTED`.
    pub disconnect_timeout: Duration,
    /// See [`WRITE_PACING`].
    pub write_pacing: usize,
    /// Per-subscriber inbox size on the command event bus.
    pub event_capacity: usize,
    /// Log every command record at `info` instead of `trace`.
    pub debug: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            cmd_port: 8300,
            data_port: 8301,
            connect_timeout: Duration::from_secs(10),
            dial_timeout: Duration::from_secs(120),
            buffer_timeout: Duration::from_secs(60),
            disconnect_timeout: Duration::from_secs(60),
            write_pacing: WRITE_PACING,
            event_capacity: 64,
            debug: false,
        }
    }
}

impl ModemConfig {
    /// Transport settings shared by both channels.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            host: self.host.clone(),
            connect_timeout: self.connect_timeout,
        }
    }
}
