// Shared transport configuration for opening the modem's TCP channels.
//
// The command and data channels live on the same host but different
// ports. Both go through `TransportConfig::connect` so timeouts and
// socket options are applied in one place.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::codec::CommandCodec;
use crate::error::Error;

/// Read side of the command channel, yielding parsed records.
pub type CommandReader = FramedRead<OwnedReadHalf, CommandCodec>;

/// Write side of the command channel, accepting [`Request`](crate::Request)s.
pub type CommandWriter = FramedWrite<OwnedWriteHalf, CommandCodec>;

/// Shared transport configuration for both modem channels.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Host running the modem program.
    pub host: String,
    /// Upper bound on a single TCP connect.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Open a TCP connection to `port` on the configured host.
    ///
    /// `channel` names the connection in errors and logs
    /// (`"command"` or `"data"`).
    pub async fn connect(&self, channel: &'static str, port: u16) -> Result<TcpStream, Error> {
        let addr = format!("{}:{port}", self.host);
        tracing::debug!(channel, %addr, "connecting to modem");

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::ConnectTimeout {
                channel,
                addr: addr.clone(),
                timeout_secs: self.connect_timeout.as_secs(),
            })?
            .map_err(|source| Error::Connect {
                channel,
                addr: addr.clone(),
                source,
            })?;

        // Command records are tiny and latency matters more than batching.
        stream.set_nodelay(true)?;

        tracing::debug!(channel, %addr, "modem channel open");
        Ok(stream)
    }

    /// Open the command channel and split it into framed halves.
    pub async fn connect_command(&self, port: u16) -> Result<(CommandReader, CommandWriter), Error> {
        let stream = self.connect("command", port).await?;
        Ok(split_command(stream))
    }
}

/// Frame an already-connected command channel.
pub fn split_command(stream: TcpStream) -> (CommandReader, CommandWriter) {
    let (read, write) = stream.into_split();
    (
        FramedRead::new(read, CommandCodec::new()),
        FramedWrite::new(write, CommandCodec::new()),
    )
}
