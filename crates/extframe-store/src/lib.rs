//! Storage primitives consumed by the external frame protocol.
//!
//! The protocol never touches storage directly. It goes through
//! [`FrameStore`]: resolve a frame, read one partition's [`Chunk`]s, create
//! per-column [`ColumnBuilder`]s for a new partition and seal them.
//! [`MemoryStore`] is a complete in-process implementation used by the node
//! binary and the tests.

pub mod builder;
pub mod chunk;
pub mod error;
pub mod memory;
pub mod types;

pub use builder::ColumnBuilder;
pub use chunk::{Chunk, ColumnData, ColumnSummary, FrameInfo, Rollups};
pub use error::{Result, StoreError};
pub use memory::{FrameBuilder, MemoryStore};
pub use types::{ColumnType, Number};

/// Storage operations the protocol backends rely on.
///
/// Implementations provide their own locking; sessions for different
/// partitions call into the same store concurrently.
pub trait FrameStore: Send + Sync {
    /// Look up a frame and its column metadata, including numeric rollups.
    fn resolve_frame(&self, key: &str) -> Option<FrameInfo>;

    /// Read-only views of every column of one sealed partition.
    fn get_chunks(&self, key: &str, partition: usize) -> Result<Vec<Chunk>>;

    /// One empty builder per column for a partition that does not exist yet.
    fn create_builders(
        &self,
        key: &str,
        column_types: &[ColumnType],
        partition: usize,
    ) -> Result<Vec<ColumnBuilder>>;

    /// Commit filled builders as a new partition, making it visible to readers.
    fn seal_builders(&self, key: &str, partition: usize, builders: Vec<ColumnBuilder>)
        -> Result<()>;
}

impl<S: FrameStore + ?Sized> FrameStore for std::sync::Arc<S> {
    fn resolve_frame(&self, key: &str) -> Option<FrameInfo> {
        (**self).resolve_frame(key)
    }

    fn get_chunks(&self, key: &str, partition: usize) -> Result<Vec<Chunk>> {
        (**self).get_chunks(key, partition)
    }

    fn create_builders(
        &self,
        key: &str,
        column_types: &[ColumnType],
        partition: usize,
    ) -> Result<Vec<ColumnBuilder>> {
        (**self).create_builders(key, column_types, partition)
    }

    fn seal_builders(
        &self,
        key: &str,
        partition: usize,
        builders: Vec<ColumnBuilder>,
    ) -> Result<()> {
        (**self).seal_builders(key, partition, builders)
    }
}
