//! `vara listen`: answer inbound calls and pipe them to stdin/stdout.

use tracing::info;

use vara_core::Modem;

use crate::cli::ListenArgs;
use crate::commands::pipe::{self, Input};
use crate::error::CliError;

pub async fn handle(modem: &Modem, args: &ListenArgs) -> Result<(), CliError> {
    let outcome = tokio::select! {
        res = serve(modem, args.keep_listening) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    let closed = modem.close().await;
    outcome?;
    closed.map_err(CliError::from)
}

async fn serve(modem: &Modem, keep_listening: bool) -> Result<(), CliError> {
    let mut input = Input::stdin();
    loop {
        info!(mycall = %modem.local_addr(), "waiting for a call");
        let stream = modem.accept().await?;

        pipe::run(&stream, &mut input).await?;
        if !keep_listening {
            return Ok(());
        }
    }
}
