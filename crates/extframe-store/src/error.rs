use crate::types::ColumnType;

/// Errors raised by storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No frame is registered under the key.
    #[error("frame '{0}' not found")]
    FrameNotFound(String),

    /// The frame exists but the partition has not been sealed.
    #[error("frame '{key}' has no partition {partition}")]
    PartitionNotFound { key: String, partition: usize },

    /// The partition was already sealed; partitions are written once.
    #[error("frame '{key}' partition {partition} already exists")]
    DuplicatePartition { key: String, partition: usize },

    /// The declared columns do not match the existing frame.
    #[error("frame '{key}' has {expected} columns, request declared {actual}")]
    ColumnCountMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    /// A declared column type does not match the existing frame.
    #[error("frame '{key}' column {column} is {expected}, request declared {actual}")]
    ColumnTypeMismatch {
        key: String,
        column: usize,
        expected: ColumnType,
        actual: ColumnType,
    },

    /// The column type code is not one the store knows.
    #[error("unknown column type code {0}")]
    UnknownColumnType(u8),

    /// A value of the wrong kind was appended to a builder.
    #[error("cannot append {value} to {column_type} column {column}")]
    AppendMismatch {
        column: usize,
        column_type: ColumnType,
        value: &'static str,
    },

    /// Text appended to a UUID column is not a UUID.
    #[error("column {column}: invalid UUID '{text}'")]
    InvalidUuid { column: usize, text: String },

    /// Builders handed to seal disagree on the number of rows.
    #[error("builders for partition {partition} hold unequal row counts {counts:?}")]
    RaggedPartition {
        partition: usize,
        counts: Vec<usize>,
    },

    /// A frame is already registered under the key.
    #[error("frame '{0}' already exists")]
    FrameExists(String),

    /// Source columns of a frame definition have different lengths.
    #[error("frame '{key}' columns have unequal lengths {counts:?}")]
    UnequalColumns { key: String, counts: Vec<usize> },

    /// A chunk layout does not cover the frame's rows exactly.
    #[error("frame '{key}' has {rows} rows but the chunk layout covers {covered}")]
    LayoutMismatch {
        key: String,
        rows: usize,
        covered: usize,
    },

    /// A frame needs at least one column.
    #[error("frame '{0}' declares no columns")]
    NoColumns(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
