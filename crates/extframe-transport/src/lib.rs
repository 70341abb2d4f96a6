//! Stream transport for the external frame protocol.
//!
//! Storage nodes listen on either a TCP address or a Unix domain socket path.
//! External clients connect to the node owning the partition they want and get
//! back an [`IpcStream`], a plain duplex byte stream. Nothing in this crate
//! knows about the protocol carried on top of it.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stream;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::{connect, Listener};
pub use stream::IpcStream;
