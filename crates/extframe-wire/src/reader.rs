use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{decode_len, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Decodes wire values from any `Read` stream.
///
/// Owns the session's inbound buffer. Partial reads are handled internally;
/// every `read_*` call returns a complete value or an error.
pub struct WireReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> WireReader<T> {
    /// Create a new wire reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new wire reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read one byte, or `None` if the stream ended cleanly before it.
    ///
    /// Used at request boundaries, where EOF means the peer is done rather
    /// than that a value was cut short.
    pub fn try_read_u8(&mut self) -> Result<Option<u8>> {
        if self.buf.is_empty() && self.read_chunk()? == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.get_u8()))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.fill(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.fill(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.fill(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.fill(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.fill(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.fill(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.fill(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.fill(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Read a length-prefixed string; `None` when the sender marked it absent.
    pub fn read_str(&mut self) -> Result<Option<String>> {
        let raw = self.read_i32()?;
        let Some(len) = decode_len("string", raw, self.config.max_string_len)? else {
            return Ok(None);
        };
        self.fill(len)?;
        let bytes = self.buf.split_to(len);
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// Read a count-prefixed array of 4-byte integers.
    pub fn read_i32_array(&mut self) -> Result<Option<Vec<i32>>> {
        let raw = self.read_i32()?;
        let Some(count) = decode_len("int array", raw, self.config.max_array_len)? else {
            return Ok(None);
        };
        self.fill(count * 4)?;
        Ok(Some((0..count).map(|_| self.buf.get_i32_le()).collect()))
    }

    /// Read a count-prefixed byte array.
    pub fn read_u8_array(&mut self) -> Result<Option<Vec<u8>>> {
        let raw = self.read_i32()?;
        let Some(count) = decode_len("byte array", raw, self.config.max_array_len)? else {
            return Ok(None);
        };
        self.fill(count)?;
        Ok(Some(self.buf.split_to(count).to_vec()))
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Any buffered, undecoded bytes are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    fn fill(&mut self, needed: usize) -> Result<()> {
        while self.buf.len() < needed {
            if self.read_chunk()? == 0 {
                debug!(needed, buffered = self.buf.len(), "stream ended mid-value");
                return Err(WireError::ConnectionClosed);
            }
        }
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BufMut;

    use super::*;

    fn reader_over(bytes: BytesMut) -> WireReader<Cursor<Vec<u8>>> {
        WireReader::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn reads_fixed_width_values() {
        let mut wire = BytesMut::new();
        wire.put_i8(-5);
        wire.put_u16_le(65_000);
        wire.put_i16_le(-300);
        wire.put_i32_le(123_456);
        wire.put_i64_le(-9_000_000_000);
        wire.put_f32_le(1.5);
        wire.put_f64_le(-2.25);

        let mut reader = reader_over(wire);
        assert_eq!(reader.read_i8().unwrap(), -5);
        assert_eq!(reader.read_u16().unwrap(), 65_000);
        assert_eq!(reader.read_i16().unwrap(), -300);
        assert_eq!(reader.read_i32().unwrap(), 123_456);
        assert_eq!(reader.read_i64().unwrap(), -9_000_000_000);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -2.25);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn reads_strings_and_arrays() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(3);
        wire.put_slice(b"abc");
        wire.put_i32_le(-1);
        wire.put_i32_le(2);
        wire.put_i32_le(7);
        wire.put_i32_le(9);
        wire.put_i32_le(3);
        wire.put_slice(&[7, 0, 3]);

        let mut reader = reader_over(wire);
        assert_eq!(reader.read_str().unwrap().as_deref(), Some("abc"));
        assert_eq!(reader.read_str().unwrap(), None);
        assert_eq!(reader.read_i32_array().unwrap(), Some(vec![7, 9]));
        assert_eq!(reader.read_u8_array().unwrap(), Some(vec![7, 0, 3]));
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        wire.put_i64_le(0x0102_0304_0506_0708);
        wire.put_i32_le(5);
        wire.put_slice(b"slow!");

        let mut reader = WireReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });
        assert_eq!(reader.read_i64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(reader.read_str().unwrap().as_deref(), Some("slow!"));
    }

    #[test]
    fn connection_closed_mid_value() {
        let mut reader = WireReader::new(Cursor::new(vec![1u8, 2]));
        let err = reader.read_i32().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn clean_eof_at_boundary() {
        let mut reader = WireReader::new(Cursor::new(vec![42u8]));
        assert_eq!(reader.try_read_u8().unwrap(), Some(42));
        assert_eq!(reader.try_read_u8().unwrap(), None);
    }

    #[test]
    fn string_over_limit_rejected() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(64);
        wire.put_slice(&[b'x'; 64]);

        let cfg = WireConfig {
            max_string_len: 16,
            ..WireConfig::default()
        };
        let mut reader = WireReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_str().unwrap_err();
        assert!(matches!(err, WireError::TooLong { len: 64, max: 16, .. }));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(2);
        wire.put_slice(&[0xC3, 0x28]);

        let mut reader = reader_over(wire);
        assert!(matches!(
            reader.read_str().unwrap_err(),
            WireError::InvalidUtf8(_)
        ));
    }

    #[test]
    fn negative_array_count_rejected() {
        let mut wire = BytesMut::new();
        wire.put_i32_le(-7);

        let mut reader = reader_over(wire);
        assert!(matches!(
            reader.read_i32_array().unwrap_err(),
            WireError::InvalidLength { len: -7, .. }
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut reader = WireReader::new(InterruptedThenData {
            interrupted: false,
            bytes: 77i32.to_le_bytes().to_vec(),
            pos: 0,
        });
        assert_eq!(reader.read_i32().unwrap(), 77);
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut reader = WireReader::new(AlwaysWouldBlock);
        let err = reader.read_u8().unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = WireReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_string_len, crate::DEFAULT_MAX_STRING_LEN);
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct AlwaysWouldBlock;

    impl Read for AlwaysWouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
