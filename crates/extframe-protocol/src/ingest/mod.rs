//! Ingest sessions: fill one new partition from an external writer.
//!
//! Integral wire types reserve the value `111` and strings reserve `"^"`.
//! Either is always followed by one marker byte telling the receiver whether
//! it stands for itself or for a missing value. Floating-point columns send
//! NaN for missing values and need no marker.

pub mod backend;
pub mod client;
pub mod cursor;

pub use backend::{serve_ingest, IngestRequest};
pub use client::IngestClient;
pub use cursor::ColumnCursor;
