// Record framing for the command channel.
//
// The modem terminates records with `\r`; some builds (and most test
// harnesses) use `\n` or `\r\n`. Any of them ends a record, and the empty
// records produced by `\r\n` pairs are skipped.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::{Command, Request};
use crate::error::Error;

/// Longest record accepted before the stream is declared desynchronized.
pub const MAX_RECORD_LEN: usize = 1 << 16;

/// Splits the command channel into [`Command`]s and writes [`Request`]s.
#[derive(Debug, Clone, Default)]
pub struct CommandCodec {
    /// Bytes of the buffer already scanned for a delimiter.
    scanned: usize,
}

impl CommandCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_delimiter(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

impl Decoder for CommandCodec {
    type Item = Command;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Command>, Error> {
        loop {
            let unscanned = buf.get(self.scanned..).unwrap_or_default();
            let Some(offset) = unscanned.iter().position(|b| is_delimiter(*b)) else {
                if buf.len() > MAX_RECORD_LEN {
                    return Err(Error::RecordTooLong {
                        max: MAX_RECORD_LEN,
                    });
                }
                self.scanned = buf.len();
                return Ok(None);
            };

            let end = self.scanned + offset;
            self.scanned = 0;
            let mut line = buf.split_to(end + 1);
            line.truncate(end);

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(Command::parse(&String::from_utf8_lossy(&line))));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Command>, Error> {
        if let Some(cmd) = self.decode(buf)? {
            return Ok(Some(cmd));
        }
        // Trailing record without a delimiter.
        self.scanned = 0;
        let rest = buf.split();
        if rest.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(Command::parse(&String::from_utf8_lossy(&rest))))
    }
}

impl Encoder<Request> for CommandCodec {
    type Error = Error;

    fn encode(&mut self, req: Request, dst: &mut BytesMut) -> Result<(), Error> {
        let text = req.to_string();
        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(b'\r');
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
