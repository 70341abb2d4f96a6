//! Export sessions: stream one sealed partition to an external reader.

pub mod backend;
pub mod client;

pub use backend::{serve_export, ExportRequest};
pub use client::ExportClient;
