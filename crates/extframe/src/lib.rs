//! Stream columnar partitions into and out of a storage node.
//!
//! A client outside the cluster opens one session per partition: ingest
//! sends every value of a new partition, export receives every selected
//! value of an existing one. Missing values travel in band.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix domain socket endpoints
//! - [`wire`]: little-endian value codec and protocol constants
//! - [`store`]: the storage interface and an in-memory implementation
//! - [`protocol`]: ingest and export sessions, wire-type negotiation, the node server
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use extframe::protocol::{connect, FrameServer, ServerConfig};
//! use extframe::store::MemoryStore;
//! use extframe::transport::Endpoint;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint: Endpoint = "127.0.0.1:54321".parse()?;
//! let server = FrameServer::bind(&endpoint, Arc::new(MemoryStore::new()), ServerConfig::default())?;
//! std::thread::spawn(move || server.serve());
//! let _conn = connect(&endpoint)?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use extframe_transport::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use extframe_wire::*;
}

/// Re-export storage types.
pub mod store {
    pub use extframe_store::*;
}

/// Re-export session types.
pub mod protocol {
    pub use extframe_protocol::*;
}
