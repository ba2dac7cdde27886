//! Command-channel vocabulary.
//!
//! Inbound records from the modem are parsed into [`Command`] values,
//! each tagged with an [`EventKind`] used for subscription filtering.
//! Outbound instructions are typed as [`Request`] and rendered to their
//! wire text by `Display`.

use std::fmt;

use strum::{Display, EnumIter, EnumString};

// ── EventKind ────────────────────────────────────────────────────────

/// Discriminant of a [`Command`], without payload.
///
/// Subscribers register interest by kind. Parses case-insensitively
/// from its snake_case name (`"busy_on"`, `"buffer"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventKind {
    Connected,
    Disconnected,
    BusyOn,
    BusyOff,
    PttOn,
    PttOff,
    Ok,
    Alive,
    Buffer,
    Unknown,
}

// ── Command ──────────────────────────────────────────────────────────

/// A single parsed record from the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CONNECTED <source> <destination> [bandwidth]`.
    ///
    /// Both call signs are optional; some modem builds send a bare
    /// `CONNECTED`.
    Connected {
        source: Option<String>,
        destination: Option<String>,
    },
    /// `DISCONNECTED`: the RF link is gone.
    Disconnected,
    /// `BUSY ON`: the channel is occupied by another station.
    BusyOn,
    /// `BUSY OFF`.
    BusyOff,
    /// `PTT ON`: the modem wants the transmitter keyed.
    PttOn,
    /// `PTT OFF`.
    PttOff,
    /// `OK`: acknowledgement of the last request.
    Ok,
    /// `IAMALIVE`: keepalive.
    Alive,
    /// `BUFFER <n>`: bytes still queued for transmission inside the modem.
    Buffer(usize),
    /// Anything else, kept verbatim.
    Unknown(String),
}

impl Command {
    /// Parse one record (without its delimiter).
    ///
    /// Never fails: unrecognized or malformed records come back as
    /// [`Command::Unknown`].
    pub fn parse(record: &str) -> Self {
        let record = record.trim();
        match record {
            "DISCONNECTED" => return Self::Disconnected,
            "BUSY ON" => return Self::BusyOn,
            "BUSY OFF" => return Self::BusyOff,
            "PTT ON" => return Self::PttOn,
            "PTT OFF" => return Self::PttOff,
            "OK" => return Self::Ok,
            "IAMALIVE" => return Self::Alive,
            _ => {}
        }

        if let Some(rest) = record.strip_prefix("CONNECTED") {
            let mut calls = rest.split_whitespace().map(str::to_owned);
            return Self::Connected {
                source: calls.next(),
                destination: calls.next(),
            };
        }

        if let Some(rest) = record.strip_prefix("BUFFER") {
            if let Ok(n) = rest.trim().parse::<usize>() {
                return Self::Buffer(n);
            }
        }

        Self::Unknown(record.to_owned())
    }

    /// The payload-free discriminant of this command.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::BusyOn => EventKind::BusyOn,
            Self::BusyOff => EventKind::BusyOff,
            Self::PttOn => EventKind::PttOn,
            Self::PttOff => EventKind::PttOff,
            Self::Ok => EventKind::Ok,
            Self::Alive => EventKind::Alive,
            Self::Buffer(_) => EventKind::Buffer,
            Self::Unknown(_) => EventKind::Unknown,
        }
    }

    /// `true` for the event that ends a session.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected {
                source,
                destination,
            } => {
                f.write_str("CONNECTED")?;
                for call in [source, destination].into_iter().flatten() {
                    write!(f, " {call}")?;
                }
                Ok(())
            }
            Self::Disconnected => f.write_str("DISCONNECTED"),
            Self::BusyOn => f.write_str("BUSY ON"),
            Self::BusyOff => f.write_str("BUSY OFF"),
            Self::PttOn => f.write_str("PTT ON"),
            Self::PttOff => f.write_str("PTT OFF"),
            Self::Ok => f.write_str("OK"),
            Self::Alive => f.write_str("IAMALIVE"),
            Self::Buffer(n) => write!(f, "BUFFER {n}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────

/// An instruction sent to the modem over the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `MYCALL <call>`: register the local station's call sign.
    MyCall(String),
    /// `LISTEN ON` / `LISTEN OFF`: accept inbound calls or not.
    Listen(bool),
    /// `CONNECT <source> <target>`: place an outbound call.
    Connect { source: String, target: String },
    /// `DISCONNECT`: graceful hang-up after the TX buffer drains.
    Disconnect,
    /// `ABORT`: immediate hang-up, queued data is discarded.
    Abort,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MyCall(call) => write!(f, "MYCALL {call}"),
            Self::Listen(true) => f.write_str("LISTEN ON"),
            Self::Listen(false) => f.write_str("LISTEN OFF"),
            Self::Connect { source, target } => write!(f, "CONNECT {source} {target}"),
            Self::Disconnect => f.write_str("DISCONNECT"),
            Self::Abort => f.write_str("ABORT"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_fixed_tokens() {
        assert_eq!(Command::parse("DISCONNECTED"), Command::Disconnected);
        assert_eq!(Command::parse("BUSY ON"), Command::BusyOn);
        assert_eq!(Command::parse("BUSY OFF"), Command::BusyOff);
        assert_eq!(Command::parse("PTT ON"), Command::PttOn);
        assert_eq!(Command::parse("PTT OFF"), Command::PttOff);
        assert_eq!(Command::parse("OK"), Command::Ok);
        assert_eq!(Command::parse("IAMALIVE"), Command::Alive);
    }

    #[test]
    fn parses_connected_with_calls() {
        assert_eq!(
            Command::parse("CONNECTED W1AW N0CALL 2300"),
            Command::Connected {
                source: Some("W1AW".into()),
                destination: Some("N0CALL".into()),
            }
        );
    }

    #[test]
    fn parses_bare_connected() {
        assert_eq!(
            Command::parse("CONNECTED"),
            Command::Connected {
                source: None,
                destination: None,
            }
        );
    }

    #[test]
    fn disconnected_is_not_a_connected_prefix_match() {
        assert_eq!(Command::parse("DISCONNECTED").kind(), EventKind::Disconnected);
    }

    #[test]
    fn parses_buffer_counts() {
        assert_eq!(Command::parse("BUFFER 42"), Command::Buffer(42));
        assert_eq!(Command::parse("BUFFER 0"), Command::Buffer(0));
        assert_eq!(Command::parse("  BUFFER 7  "), Command::Buffer(7));
    }

    #[test]
    fn malformed_buffer_is_unknown() {
        assert_eq!(
            Command::parse("BUFFER lots"),
            Command::Unknown("BUFFER lots".into())
        );
        assert_eq!(Command::parse("BUFFER -3").kind(), EventKind::Unknown);
    }

    #[test]
    fn unknown_records_are_kept_verbatim() {
        assert_eq!(
            Command::parse("REGISTERED N0CALL"),
            Command::Unknown("REGISTERED N0CALL".into())
        );
    }

    #[test]
    fn display_matches_wire_text() {
        for record in ["CONNECTED W1AW N0CALL", "BUFFER 12", "PTT ON", "IAMALIVE", "VERSION 4.8"] {
            assert_eq!(Command::parse(record).to_string(), record);
        }
    }

    #[test]
    fn event_kind_from_str() {
        assert_eq!("buffer".parse::<EventKind>().ok(), Some(EventKind::Buffer));
        assert_eq!("BUSY_ON".parse::<EventKind>().ok(), Some(EventKind::BusyOn));
        assert!("nonsense".parse::<EventKind>().is_err());
        assert_eq!(EventKind::PttOff.to_string(), "ptt_off");
    }

    #[test]
    fn requests_render_wire_text() {
        assert_eq!(Request::MyCall("N0CALL".into()).to_string(), "MYCALL N0CALL");
        assert_eq!(Request::Listen(true).to_string(), "LISTEN ON");
        assert_eq!(Request::Listen(false).to_string(), "LISTEN OFF");
        assert_eq!(
            Request::Connect {
                source: "N0CALL".into(),
                target: "W1AW".into(),
            }
            .to_string(),
            "CONNECT N0CALL W1AW"
        );
        assert_eq!(Request::Disconnect.to_string(), "DISCONNECT");
        assert_eq!(Request::Abort.to_string(), "ABORT");
    }
}
