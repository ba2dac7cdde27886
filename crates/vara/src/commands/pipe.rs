//! Shovel bytes between stdin/stdout and an established link.

use std::io::Read;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use vara_core::DataStream;

use crate::error::CliError;

/// Read size for stdin. Writes are paced relative to their length, so
/// this also sets how far ahead of the radio we are allowed to run.
const CHUNK: usize = 512;

/// Chunks read ahead of the link before the reader thread blocks.
const READ_AHEAD: usize = 4;

/// Stdin, read on its own OS thread.
///
/// A pending read on tokio's stdin holds up runtime shutdown until the
/// next line arrives. This thread is detached and dies with the process.
/// Create one per process and share it across calls.
pub struct Input {
    rx: mpsc::Receiver<std::io::Result<Vec<u8>>>,
}

impl Input {
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel(READ_AHEAD);
        std::thread::spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut buf = vec![0u8; CHUNK];
            loop {
                let chunk = match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => Ok(buf[..n].to_vec()),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = chunk.is_err();
                if tx.blocking_send(chunk).is_err() || failed {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Next chunk; `Ok(None)` at EOF, then forever after.
    async fn next(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.rx.recv().await.transpose()
    }
}

/// Pipe stdin to the link and the link to stdout.
///
/// On stdin EOF the link is drained, then closed gracefully while any
/// remaining inbound data is still copied out. Returns once the link is
/// down.
pub async fn run(stream: &DataStream, input: &mut Input) -> Result<(), CliError> {
    let uplink = async {
        while let Some(chunk) = input.next().await? {
            match stream.write(&chunk).await {
                Ok(_) => {}
                Err(e) if e.is_end_of_stream() => return Ok(()),
                Err(e) => return Err(CliError::from(e)),
            }
        }
        debug!("stdin closed, waiting for modem to drain");
        stream.flush().await?;
        Ok::<(), CliError>(())
    };

    let downlink = async {
        let mut stdout = tokio::io::stdout();
        let mut buf = vec![0u8; CHUNK];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            stdout.write_all(&buf[..n]).await?;
            stdout.flush().await?;
        }
        Ok::<(), CliError>(())
    };

    tokio::pin!(uplink, downlink);

    tokio::select! {
        res = &mut downlink => {
            info!(remote = %stream.remote_addr(), "remote station closed the link");
            return res;
        }
        res = &mut uplink => res?,
    }

    let (closed, drained) = tokio::join!(stream.close(), &mut downlink);
    closed?;
    drained
}
