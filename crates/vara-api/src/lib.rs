// vara-api: Wire-level client for the VARA modem TCP command and data ports

pub mod codec;
pub mod command;
pub mod error;
pub mod transport;

pub use codec::CommandCodec;
pub use command::{Command, EventKind, Request};
pub use error::Error;
pub use transport::TransportConfig;
