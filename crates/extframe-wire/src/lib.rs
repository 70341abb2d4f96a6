//! Wire codec for the external frame protocol.
//!
//! Every session owns one [`WireReader`] (inbound buffer) and one
//! [`WireWriter`] (outbound buffer). Values are little-endian and fixed width:
//!
//! - integers: 1 (byte), 2 (char / short), 4 (int), 8 (long) bytes
//! - floats: IEEE-754, 4 or 8 bytes
//! - strings: 4-byte signed length (`-1` = absent) followed by UTF-8 bytes
//! - arrays: 4-byte signed count (`-1` = absent) followed by the elements
//!
//! Nothing on the wire is self-describing; both sides agree on the order and
//! type of every value out of band.

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use codec::{WireConfig, ABSENT_LEN, DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_STRING_LEN};
pub use error::{Result, WireError};
pub use reader::WireReader;
pub use types::{
    Command, EscapeMarker, WireType, CONFIRM_READING_DONE, CONFIRM_WRITING_DONE, INIT_BYTE, IS_NA,
    NOT_NA, NUM_MARKER_NEXT_BYTE_FOLLOWS, STR_MARKER_NEXT_BYTE_FOLLOWS,
};
pub use writer::WireWriter;
