//! The external frame protocol.
//!
//! Lets a process outside the storage cluster stream values into a new
//! partition of a frame ([`ingest`]) or out of an existing one ([`export`])
//! over a plain duplex byte stream.
//!
//! Every request starts with the init byte and a 4-byte command code. Export
//! answers with the partition's row count, the selected cells row by row and
//! a completion byte `1`. Ingest streams every cell of the partition and is
//! answered with a 4-byte completion code `2` once the partition is sealed.
//!
//! Backends run against any [`extframe_store::FrameStore`]. [`FrameServer`]
//! serves them over the transport, and [`connect`] opens the client side.

pub mod config;
pub mod connection;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod ingest;
pub mod negotiate;
pub mod server;
pub mod value;

pub use config::{FlushPolicy, ServerConfig, SessionConfig, DEFAULT_FLUSH_THRESHOLD};
pub use connection::Connection;
pub use connector::{connect, connect_with_config, ClientConnection};
pub use dispatch::{dispatch, serve_request, RequestSummary};
pub use error::{ProtocolError, Result};
pub use export::{serve_export, ExportClient, ExportRequest};
pub use ingest::{serve_ingest, ColumnCursor, IngestClient, IngestRequest};
pub use negotiate::{classify_column, classify_numeric, prepare_wire_types};
pub use server::{serve_connection, FrameServer, ShutdownHandle};
pub use value::Value;
