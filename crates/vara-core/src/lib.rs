//! Connection layer between `vara-api` and applications (CLI, mail clients).
//!
//! A VARA modem is driven over two TCP connections: a text command channel
//! and a raw data channel. This crate turns that pair into a connection
//! oriented byte stream:
//!
//! - **[`Modem`]**: session controller. [`dial()`](Modem::dial) places a
//!   call, [`accept()`](Modem::accept) answers one, and
//!   [`close()`](Modem::close) aborts and tears everything down.
//!
//! - **[`DataStream`]**: one established link. Reads come off the data
//!   channel; writes are paced against the modem's `BUFFER` reports so the
//!   application never runs far ahead of the radio.
//!
//! - **[`EventBus`]** / **[`Subscription`]**: non-blocking fan-out of
//!   command events to any number of filtered subscribers.
//!
//! - **[`PttController`]**: hook for keying the transmitter when the modem
//!   asks for it.

pub mod addr;
pub mod buffer;
pub mod bus;
pub mod config;
pub mod error;
pub mod modem;
pub mod ptt;
mod session;
pub mod state;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use addr::{Addr, NETWORK, normalize_callsign};
pub use buffer::BufferCount;
pub use bus::{EventBus, Subscription};
pub use config::{ModemConfig, WRITE_PACING};
pub use error::CoreError;
pub use modem::Modem;
pub use ptt::{PttBridge, PttController, PttError};
pub use state::{ConnectionState, StateMachine, Transition};
pub use stream::DataStream;

// Wire types callers need for subscriptions.
pub use vara_api::{Command, EventKind};
