use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};

/// Length prefix marking an absent string or array.
pub const ABSENT_LEN: i32 = -1;

/// Default maximum string payload: 16 MiB.
pub const DEFAULT_MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Default maximum array element count (column lists, type arrays).
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Configuration for wire readers and writers.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Maximum accepted string payload in bytes.
    pub max_string_len: usize,
    /// Maximum accepted array element count.
    pub max_array_len: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode an optional string as `len:i32 | utf8 bytes`.
///
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length (4B)  │ UTF-8 bytes      │
/// │ i32 LE, -1   │ (Length bytes)   │
/// │ when absent  │                  │
/// └──────────────┴──────────────────┘
/// ```
pub fn encode_str(value: Option<&str>, max: usize, dst: &mut BytesMut) -> Result<()> {
    let Some(value) = value else {
        dst.put_i32_le(ABSENT_LEN);
        return Ok(());
    };
    let len = checked_len("string", value.len(), max)?;
    dst.reserve(4 + value.len());
    dst.put_i32_le(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Encode an optional array of 4-byte integers as `count:i32 | elements`.
pub fn encode_i32_array(values: Option<&[i32]>, max: usize, dst: &mut BytesMut) -> Result<()> {
    let Some(values) = values else {
        dst.put_i32_le(ABSENT_LEN);
        return Ok(());
    };
    let count = checked_len("int array", values.len(), max)?;
    dst.reserve(4 + values.len() * 4);
    dst.put_i32_le(count);
    for &value in values {
        dst.put_i32_le(value);
    }
    Ok(())
}

/// Encode an optional byte array as `count:i32 | bytes`.
pub fn encode_u8_array(values: Option<&[u8]>, max: usize, dst: &mut BytesMut) -> Result<()> {
    let Some(values) = values else {
        dst.put_i32_le(ABSENT_LEN);
        return Ok(());
    };
    let count = checked_len("byte array", values.len(), max)?;
    dst.reserve(4 + values.len());
    dst.put_i32_le(count);
    dst.put_slice(values);
    Ok(())
}

/// Interpret a decoded length prefix: `None` for absent, the length otherwise.
pub fn decode_len(what: &'static str, raw: i32, max: usize) -> Result<Option<usize>> {
    if raw == ABSENT_LEN {
        return Ok(None);
    }
    let len = usize::try_from(raw).map_err(|_| WireError::InvalidLength { what, len: raw })?;
    if len > max {
        return Err(WireError::TooLong { what, len, max });
    }
    Ok(Some(len))
}

fn checked_len(what: &'static str, len: usize, max: usize) -> Result<i32> {
    if len > max {
        return Err(WireError::TooLong { what, len, max });
    }
    i32::try_from(len).map_err(|_| WireError::TooLong {
        what,
        len,
        max: i32::MAX as usize,
    })
}
