/// Errors that can occur while encoding or decoding wire values.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// An I/O error occurred while reading or writing.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a value.
    #[error("connection closed (incomplete value)")]
    ConnectionClosed,

    /// A length or count prefix is negative (other than the absent marker).
    #[error("invalid {what} length {len}")]
    InvalidLength { what: &'static str, len: i32 },

    /// A string or array exceeds the configured limit.
    #[error("{what} too long ({len}, max {max})")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The wire type tag is not one this codec knows.
    #[error("unknown wire type tag {0}")]
    UnknownWireType(u8),

    /// The request command code is not one this codec knows.
    #[error("unknown command code {0}")]
    UnknownCommand(i32),

    /// A sentinel escape marker is neither "original value" nor "NA".
    #[error("invalid escape marker {0}")]
    InvalidMarker(u8),

    /// An export NA flag is neither NOT_NA nor IS_NA.
    #[error("invalid NA flag {0}")]
    InvalidNaFlag(u8),
}

pub type Result<T> = std::result::Result<T, WireError>;
