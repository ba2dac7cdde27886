// ── Core error types ──
//
// User-facing errors from vara-core. Transport details from `vara_api`
// are folded into these variants by the `From<vara_api::Error>` impl so
// callers can tell a stalled modem from a closed connection without
// matching on socket errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to VARA modem at {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("Connection to {remote} failed")]
    ConnectFailed { remote: String },

    #[error("A connection is already established")]
    AlreadyConnected,

    #[error("Timed out after {timeout_secs}s waiting for {operation}")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    // ── Stream errors ────────────────────────────────────────────────
    /// The connection is (or became) disconnected. The stream analogue
    /// of reading past EOF; reconnecting is the caller's business.
    #[error("End of stream")]
    EndOfStream,

    /// No `BUFFER` update from the modem within the inactivity timeout.
    #[error("{operation}: buffer timeout after {timeout_secs}s")]
    BufferTimeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    /// The modem never confirmed a graceful disconnect; the session was aborted.
    #[error("Disconnect timeout after {timeout_secs}s - connection aborted")]
    DisconnectTimeout { timeout_secs: u64 },

    #[error("Data channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid call sign '{call}': {reason}")]
    InvalidCallsign { call: String, reason: String },

    #[error("Invalid address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Command channel error: {0}")]
    Transport(String),
}

impl CoreError {
    /// `true` for errors that mean the connection is simply gone.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// `true` for the protocol timeouts (stalled peer rather than closed one).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::BufferTimeout { .. } | Self::DisconnectTimeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vara_api::Error> for CoreError {
    fn from(err: vara_api::Error) -> Self {
        match err {
            vara_api::Error::Connect {
                channel,
                addr,
                source,
            } => CoreError::ConnectionFailed {
                addr,
                reason: format!("{channel} port: {source}"),
            },
            vara_api::Error::ConnectTimeout {
                channel,
                addr,
                timeout_secs,
            } => CoreError::ConnectionFailed {
                addr,
                reason: format!("{channel} port: no answer within {timeout_secs}s"),
            },
            vara_api::Error::Io(e) => CoreError::Io(e),
            vara_api::Error::ChannelClosed => CoreError::EndOfStream,
            e @ vara_api::Error::RecordTooLong { .. } => CoreError::Transport(e.to_string()),
        }
    }
}

impl From<CoreError> for std::io::Error {
    fn from(err: CoreError) -> Self {
        use std::io::ErrorKind;
        match err {
            CoreError::Io(e) => e,
            CoreError::EndOfStream => std::io::Error::new(ErrorKind::UnexpectedEof, err),
            e if e.is_timeout() => std::io::Error::new(ErrorKind::TimedOut, e),
            e => std::io::Error::other(e),
        }
    }
}
