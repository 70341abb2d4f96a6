//! Protocol constants and the enumerations carried on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// First byte of every request; a reused connection sends it again before the
/// next request.
pub const INIT_BYTE: u8 = 42;

/// Completion byte sent by the export backend after the last value.
pub const CONFIRM_READING_DONE: u8 = 1;

/// Completion code (4 bytes) sent by the ingest backend after sealing.
///
/// Deliberately different in value and width from [`CONFIRM_READING_DONE`].
pub const CONFIRM_WRITING_DONE: i32 = 2;

/// Export flag: the cell is missing, no value follows.
pub const IS_NA: u8 = 1;

/// Export flag: a value follows.
pub const NOT_NA: u8 = 0;

/// Integral value that is always followed by an [`EscapeMarker`] byte on ingest.
pub const NUM_MARKER_NEXT_BYTE_FOLLOWS: i64 = 111;

/// String value that is always followed by an [`EscapeMarker`] byte on ingest.
pub const STR_MARKER_NEXT_BYTE_FOLLOWS: &str = "^";

/// Request kind, sent as a 4-byte signed integer after [`INIT_BYTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Stream values into a new partition.
    Ingest,
    /// Stream values out of an existing partition.
    Export,
}

impl Command {
    pub fn code(self) -> i32 {
        match self {
            Self::Ingest => 0,
            Self::Export => 1,
        }
    }
}

impl TryFrom<i32> for Command {
    type Error = WireError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Ingest),
            1 => Ok(Self::Export),
            other => Err(WireError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest => f.write_str("ingest"),
            Self::Export => f.write_str("export"),
        }
    }
}

/// Byte following a sentinel value on ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMarker {
    /// The sentinel was genuine data.
    OriginalValue,
    /// The sentinel stands for a missing value.
    Na,
}

impl EscapeMarker {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::OriginalValue => 0,
            Self::Na => 1,
        }
    }
}

impl TryFrom<u8> for EscapeMarker {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::OriginalValue),
            1 => Ok(Self::Na),
            other => Err(WireError::InvalidMarker(other)),
        }
    }
}

/// Per-column wire encoding, chosen to minimize bytes per value.
///
/// Independent of the column's storage type: a numeric column holding small
/// integers travels as [`WireType::Byte`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Signed 8-bit integer (also used for booleans).
    Byte,
    /// Unsigned 16-bit integer.
    Char,
    /// Signed 16-bit integer.
    Short,
    /// Signed 32-bit integer.
    Int,
    /// IEEE-754 single precision.
    Float,
    /// Signed 64-bit integer (also epoch milliseconds for time columns).
    Long,
    /// IEEE-754 double precision.
    Double,
    /// Length-prefixed UTF-8 text.
    String,
}

impl WireType {
    pub const ALL: [WireType; 8] = [
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Float,
        Self::Long,
        Self::Double,
        Self::String,
    ];

    pub fn tag(self) -> u8 {
        match self {
            Self::Byte => 0,
            Self::Char => 1,
            Self::Short => 2,
            Self::Int => 3,
            Self::Float => 4,
            Self::Long => 5,
            Self::Double => 6,
            Self::String => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Long => "long",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    /// Integral types use the numeric sentinel for NA.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Char | Self::Short | Self::Int | Self::Long
        )
    }

    /// Decode a whole tag array, failing on the first unknown tag.
    pub fn decode_all(tags: &[u8]) -> Result<Vec<WireType>, WireError> {
        tags.iter().map(|&tag| WireType::try_from(tag)).collect()
    }

    /// Encode a wire-type array as tags.
    pub fn encode_all(types: &[WireType]) -> Vec<u8> {
        types.iter().map(|t| t.tag()).collect()
    }
}

impl TryFrom<u8> for WireType {
    type Error = WireError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(WireError::UnknownWireType(tag))
    }
}

impl FromStr for WireType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let lowered = input.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "bool" | "boolean" => Ok(Self::Byte),
            "timestamp" | "time" => Ok(Self::Long),
            "str" => Ok(Self::String),
            other => Self::ALL
                .into_iter()
                .find(|t| t.name() == other)
                .ok_or_else(|| format!("unknown wire type '{input}'")),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
