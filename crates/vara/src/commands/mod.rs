//! Command dispatch: bridges CLI args -> modem sessions -> stdin/stdout.

pub mod config_cmd;
pub mod connect;
pub mod listen;
pub mod monitor;
pub mod pipe;

use vara_core::Modem;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Call sign used for `monitor` when none is configured; it never goes on air.
const MONITOR_CALL: &str = "MONITOR";

/// Dispatch a modem-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    tracing::debug!(
        profile = %resolved.profile,
        host = %resolved.modem.host,
        cmd_port = resolved.modem.cmd_port,
        data_port = resolved.modem.data_port,
        "modem configured"
    );

    match cmd {
        Command::Connect(args) => {
            let modem = Modem::new(resolved.require_mycall()?, resolved.modem.clone())?;
            connect::handle(&modem, &args).await
        }
        Command::Listen(args) => {
            let modem = Modem::new(resolved.require_mycall()?, resolved.modem.clone())?;
            listen::handle(&modem, &args).await
        }
        Command::Monitor(args) => {
            let call = resolved.mycall.as_deref().unwrap_or(MONITOR_CALL);
            let modem = Modem::new(call, resolved.modem.clone())?;
            monitor::handle(&modem, args).await
        }
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
