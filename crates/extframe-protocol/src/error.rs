use extframe_wire::WireType;

/// Errors that end a protocol session.
///
/// Every variant is fatal for the stream it occurred on: the session is not
/// retried and a partially filled partition is never sealed.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] extframe_transport::TransportError),

    /// Wire encoding or stream error.
    #[error("wire error: {0}")]
    Wire(#[from] extframe_wire::WireError),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] extframe_store::StoreError),

    /// The first byte of a request was not the init marker.
    #[error("expected init byte {expected}, got {actual}")]
    BadInitByte { expected: u8, actual: u8 },

    /// The requested frame does not exist.
    #[error("frame '{0}' not found")]
    FrameNotFound(String),

    /// A request header field is missing or out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An export request selected a column the frame does not have.
    #[error("column index {index} out of range for {columns} columns")]
    ColumnOutOfRange { index: i32, columns: usize },

    /// The peer sent a row count that cannot be valid.
    #[error("invalid row count {0}")]
    InvalidRowCount(i32),

    /// A value flagged as present arrived without a payload.
    #[error("value marked present arrived absent")]
    AbsentValue,

    /// A stored cell could not be read back as its negotiated wire type.
    #[error("column {column} row {row} cannot be encoded as {wire_type}")]
    UnreadableCell {
        column: usize,
        row: usize,
        wire_type: WireType,
    },

    /// The completion acknowledgment did not carry the expected code.
    #[error("completion code mismatch: expected {expected}, got {actual}")]
    CompletionMismatch { expected: i32, actual: i32 },

    /// A value was sent with a type other than the active column's wire type.
    #[error("column {column} expects {expected}, got {actual}")]
    WireTypeMismatch {
        column: usize,
        expected: WireType,
        actual: WireType,
    },

    /// More values were sent than the session declared.
    #[error("session already holds all {expected} values")]
    TooManyValues { expected: u64 },

    /// The session was finished before every declared value was sent.
    #[error("session incomplete: sent {sent} of {expected} values")]
    IncompleteSession { expected: u64, sent: u64 },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
