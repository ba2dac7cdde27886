use thiserror::Error;

/// Top-level error type for the `vara-api` crate.
///
/// Covers the failure modes of the two TCP channels to the modem:
/// establishing them, framing command records, and raw I/O.
/// `vara-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The modem's host/port could not be resolved or refused the connection.
    #[error("couldn't connect to VARA {channel} port at {addr}: {source}")]
    Connect {
        channel: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("timed out connecting to VARA {channel} port at {addr} after {timeout_secs}s")]
    ConnectTimeout {
        channel: &'static str,
        addr: String,
        timeout_secs: u64,
    },

    /// I/O error on an established channel.
    #[error("VARA channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempted to send on a command channel that has been torn down.
    #[error("VARA command channel is closed")]
    ChannelClosed,

    // ── Framing ─────────────────────────────────────────────────────
    /// A command record grew past the framing limit without a delimiter.
    #[error("command record exceeds {max} bytes without a delimiter")]
    RecordTooLong { max: usize },
}
