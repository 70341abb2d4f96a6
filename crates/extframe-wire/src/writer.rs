use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::codec::{encode_i32_array, encode_str, encode_u8_array, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Encodes wire values into an outbound buffer and drains it onto any
/// `Write` stream.
///
/// `put_*` calls only append to the buffer; nothing reaches the stream until
/// [`WireWriter::flush`].
pub struct WireWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Write> WireWriter<T> {
    /// Create a new wire writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new wire writer with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    /// Append a length-prefixed string; `None` is encoded as absent.
    pub fn put_str(&mut self, value: Option<&str>) -> Result<()> {
        encode_str(value, self.config.max_string_len, &mut self.buf)
    }

    /// Append a count-prefixed array of 4-byte integers.
    pub fn put_i32_array(&mut self, values: Option<&[i32]>) -> Result<()> {
        encode_i32_array(values, self.config.max_array_len, &mut self.buf)
    }

    /// Append a count-prefixed byte array.
    pub fn put_u8_array(&mut self, values: Option<&[u8]>) -> Result<()> {
        encode_u8_array(values, self.config.max_array_len, &mut self.buf)
    }

    /// Bytes appended but not yet written to the stream.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drain the whole outbound buffer onto the stream and flush it (blocking).
    ///
    /// Short writes are retried until every byte is accepted.
    pub fn flush(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        trace!(bytes = offset, "drained outbound buffer");
        self.buf.clear();

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    ///
    /// Pending bytes that were never flushed are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::reader::WireReader;

    #[test]
    fn nothing_written_until_flush() {
        let mut writer = WireWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.put_i32(7);
        writer.put_u8(1);

        assert_eq!(writer.pending(), 5);
        assert!(writer.get_ref().get_ref().is_empty());

        writer.flush().unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.get_ref().get_ref(), &vec![7, 0, 0, 0, 1]);
    }

    #[test]
    fn written_bytes_decode() {
        let mut writer = WireWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.put_i16(-2);
        writer.put_u16(65_535);
        writer.put_f64(f64::NAN);
        writer.put_str(Some("frame-key")).unwrap();
        writer.put_i32_array(Some(&[0, 1])).unwrap();
        writer.put_u8_array(Some(&[6, 7])).unwrap();
        writer.flush().unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = WireReader::new(Cursor::new(wire));
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u16().unwrap(), 65_535);
        assert!(reader.read_f64().unwrap().is_nan());
        assert_eq!(reader.read_str().unwrap().as_deref(), Some("frame-key"));
        assert_eq!(reader.read_i32_array().unwrap(), Some(vec![0, 1]));
        assert_eq!(reader.read_u8_array().unwrap(), Some(vec![6, 7]));
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = WireWriter::new(OneByteWriter::default());
        writer.put_i64(0x1122_3344_5566_7788);
        writer.flush().unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data, 0x1122_3344_5566_7788i64.to_le_bytes().to_vec());
        assert_eq!(inner.writes, 8);
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = WireWriter::new(sink);

        writer.put_u8(1);
        writer.flush().unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_would_block() {
        let mut writer = WireWriter::new(FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        });
        writer.put_i32(99);
        writer.flush().unwrap();
        assert_eq!(writer.into_inner().data, 99i32.to_le_bytes().to_vec());
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = WireWriter::new(ZeroWriter);
        writer.put_u8(1);
        let err = writer.flush().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn oversized_string_rejected() {
        let cfg = WireConfig {
            max_string_len: 4,
            ..WireConfig::default()
        };
        let mut writer = WireWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);
        let err = writer.put_str(Some("oversized")).unwrap_err();
        assert!(matches!(err, WireError::TooLong { .. }));
        assert_eq!(writer.pending(), 0);
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
        writes: usize,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.failures.pop() {
                return Err(std::io::Error::from(kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
