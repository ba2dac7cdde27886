//! `vara monitor`: watch the command channel without placing a call.

use std::io::Write;

use strum::IntoEnumIterator;
use tracing::info;

use vara_core::{Command, EventKind, Modem};

use crate::cli::MonitorArgs;
use crate::error::CliError;

pub async fn handle(modem: &Modem, args: MonitorArgs) -> Result<(), CliError> {
    modem.start().await?;

    let kinds: Vec<EventKind> = if args.kinds.is_empty() {
        EventKind::iter().collect()
    } else {
        args.kinds
    };
    let Some(mut events) = modem.subscribe(&kinds) else {
        return Err(CliError::LinkLost);
    };
    info!(?kinds, "monitoring modem events");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(Command::Disconnected) | None => {
                    print_event(EventKind::Disconnected, &Command::Disconnected)?;
                    break;
                }
                Some(cmd) => print_event(cmd.kind(), &cmd)?,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    modem.close().await?;
    Ok(())
}

fn print_event(kind: EventKind, cmd: &Command) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{kind:<12} {cmd}")?;
    Ok(())
}
