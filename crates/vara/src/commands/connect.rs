//! `vara connect <CALL>`: place a call and pipe stdin/stdout over it.

use tracing::info;
use url::Url;

use vara_core::{DataStream, Modem};

use crate::cli::ConnectArgs;
use crate::commands::pipe::{self, Input};
use crate::error::CliError;

pub async fn handle(modem: &Modem, args: &ConnectArgs) -> Result<(), CliError> {
    let outcome = tokio::select! {
        res = session(modem, &args.target) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    // Always leave the modem idle and the transmitter unkeyed.
    let closed = modem.close().await;
    outcome?;
    closed.map_err(CliError::from)
}

async fn session(modem: &Modem, target: &str) -> Result<(), CliError> {
    let mut input = Input::stdin();
    let stream = dial(modem, target).await?;
    pipe::run(&stream, &mut input).await
}

async fn dial(modem: &Modem, target: &str) -> Result<DataStream, CliError> {
    if target.contains("://") {
        let url = Url::parse(target).map_err(|e| CliError::Validation {
            field: "target".into(),
            reason: format!("'{target}': {e}"),
        })?;
        Ok(modem.dial_url(&url).await?)
    } else {
        Ok(modem.dial(target).await?)
    }
}
