//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vara_config::ConfigError;
use vara_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const LINK: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Modem ────────────────────────────────────────────────────────

    #[error("Could not reach the VARA modem at {addr}")]
    #[diagnostic(
        code(vara::connection_failed),
        help(
            "Check that the modem program is running and its TCP ports match your profile.\n\
             Reason: {reason}\n\
             Try: vara --host <HOST> --cmd-port <PORT> monitor"
        )
    )]
    ConnectionFailed { addr: String, reason: String },

    #[error("Modem protocol error: {message}")]
    #[diagnostic(code(vara::protocol))]
    Protocol { message: String },

    // ── Link ─────────────────────────────────────────────────────────

    #[error("Call to {remote} failed")]
    #[diagnostic(
        code(vara::connect_failed),
        help("The remote station did not answer or rejected the call. Check frequency and bandwidth.")
    )]
    ConnectFailed { remote: String },

    #[error("The modem is already connected")]
    #[diagnostic(
        code(vara::already_connected),
        help("Another client owns the link. Close it first, or run: vara monitor")
    )]
    AlreadyConnected,

    #[error("Link to remote station lost")]
    #[diagnostic(code(vara::link_lost))]
    LinkLost,

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Timed out after {seconds}s waiting for {operation}")]
    #[diagnostic(
        code(vara::timeout),
        help("Propagation may be poor. Timeouts can be raised per profile in the config file.")
    )]
    Timeout { operation: String, seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vara::validation))]
    Validation { field: String, reason: String },

    #[error("No station call sign configured for profile '{profile}'")]
    #[diagnostic(
        code(vara::no_callsign),
        help(
            "Pass --mycall, set VARA_MYCALL, or store one with:\n\
             vara --mycall <CALL> config init"
        )
    )]
    NoCallsign { profile: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vara::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(vara::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(vara::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Protocol { .. } => exit_code::CONNECTION,
            Self::ConnectFailed { .. } | Self::AlreadyConnected | Self::LinkLost => {
                exit_code::LINK
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NoCallsign { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { addr, reason } => CliError::ConnectionFailed { addr, reason },
            CoreError::ConnectFailed { remote } => CliError::ConnectFailed { remote },
            CoreError::AlreadyConnected => CliError::AlreadyConnected,
            CoreError::Timeout {
                operation,
                timeout_secs,
            }
            | CoreError::BufferTimeout {
                operation,
                timeout_secs,
            } => CliError::Timeout {
                operation: operation.into(),
                seconds: timeout_secs,
            },
            CoreError::DisconnectTimeout { timeout_secs } => CliError::Timeout {
                operation: "disconnect".into(),
                seconds: timeout_secs,
            },
            CoreError::EndOfStream => CliError::LinkLost,
            CoreError::Io(e) => CliError::Io(e),
            CoreError::InvalidCallsign { call, reason } => CliError::Validation {
                field: "call sign".into(),
                reason: format!("'{call}': {reason}"),
            },
            CoreError::InvalidAddress { addr, reason } => CliError::Validation {
                field: "target".into(),
                reason: format!("'{addr}': {reason}"),
            },
            CoreError::Transport(message) => CliError::Protocol { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
