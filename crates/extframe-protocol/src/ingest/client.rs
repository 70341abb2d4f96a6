use std::io::{Read, Write};

use extframe_store::ColumnType;
use extframe_wire::{
    Command, EscapeMarker, WireType, CONFIRM_WRITING_DONE, INIT_BYTE,
    NUM_MARKER_NEXT_BYTE_FOLLOWS, STR_MARKER_NEXT_BYTE_FOLLOWS,
};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};
use crate::ingest::backend::IngestRequest;
use crate::ingest::cursor::ColumnCursor;
use crate::value::Value;

/// Client side of an ingest session.
///
/// Values are sent one per `send_*` call in strict row-major order. Each call
/// must match the wire type declared for the column the cursor is on.
pub struct IngestClient<'a, R, W> {
    conn: &'a mut Connection<R, W>,
    wire_types: Vec<WireType>,
    cursor: ColumnCursor,
}

impl<'a, R: Read, W: Write> IngestClient<'a, R, W> {
    /// Send the ingest header and return a client positioned at row 0, column 0.
    pub fn create_chunks(conn: &'a mut Connection<R, W>, request: IngestRequest) -> Result<Self> {
        request.validate()?;
        let total_rows = i32::try_from(request.total_rows).map_err(|_| {
            ProtocolError::InvalidRequest(format!("{} rows too many", request.total_rows))
        })?;
        let partition = i32::try_from(request.partition).map_err(|_| {
            ProtocolError::InvalidRequest(format!("partition {} too large", request.partition))
        })?;

        let wire_tags = WireType::encode_all(&request.wire_types);
        let column_codes = ColumnType::encode_all(&request.column_types);

        conn.writer.put_u8(INIT_BYTE);
        conn.writer.put_i32(Command::Ingest.code());
        conn.writer.put_str(Some(&request.key))?;
        conn.writer.put_u8_array(Some(&wire_tags))?;
        conn.writer.put_u8_array(Some(&column_codes))?;
        conn.writer.put_i32(total_rows);
        conn.writer.put_i32(partition);
        conn.writer.flush()?;

        debug!(
            frame = %request.key,
            partition = request.partition,
            rows = request.total_rows,
            "ingest opened"
        );
        let cursor = ColumnCursor::new(request.num_columns(), request.total_rows);
        Ok(Self {
            conn,
            wire_types: request.wire_types,
            cursor,
        })
    }

    /// Column the next value belongs to, `None` once every value was sent.
    pub fn current_column(&self) -> Option<usize> {
        self.cursor.active().ok()
    }

    /// Wire type expected by the next value.
    pub fn current_wire_type(&self) -> Option<WireType> {
        self.current_column().map(|c| self.wire_types[c])
    }

    pub fn values_sent(&self) -> u64 {
        self.cursor.sent()
    }

    /// Booleans travel as bytes `0` / `1`.
    /// Booleans travel in byte columns as 0 or 1.
    pub fn send_bool(&mut self, value: bool) -> Result<()> {
        self.check_wire_type(WireType::Byte)?;
        self.conn.writer.put_bool(value);
        self.finish_integral(i64::from(value))
    }

    pub fn send_byte(&mut self, value: i8) -> Result<()> {
        self.check_wire_type(WireType::Byte)?;
        self.conn.writer.put_i8(value);
        self.finish_integral(i64::from(value))
    }

    pub fn send_char(&mut self, value: u16) -> Result<()> {
        self.check_wire_type(WireType::Char)?;
        self.conn.writer.put_u16(value);
        self.finish_integral(i64::from(value))
    }

    pub fn send_short(&mut self, value: i16) -> Result<()> {
        self.check_wire_type(WireType::Short)?;
        self.conn.writer.put_i16(value);
        self.finish_integral(i64::from(value))
    }

    pub fn send_int(&mut self, value: i32) -> Result<()> {
        self.check_wire_type(WireType::Int)?;
        self.conn.writer.put_i32(value);
        self.finish_integral(i64::from(value))
    }

    pub fn send_long(&mut self, value: i64) -> Result<()> {
        self.check_wire_type(WireType::Long)?;
        self.conn.writer.put_i64(value);
        self.finish_integral(value)
    }

    /// Time values travel as epoch milliseconds on a long column.
    pub fn send_time_millis(&mut self, millis: i64) -> Result<()> {
        self.send_long(millis)
    }

    /// NaN is received as a missing value.
    pub fn send_float(&mut self, value: f32) -> Result<()> {
        self.check_wire_type(WireType::Float)?;
        self.conn.writer.put_f32(value);
        self.finish()
    }

    /// NaN is received as a missing value.
    pub fn send_double(&mut self, value: f64) -> Result<()> {
        self.check_wire_type(WireType::Double)?;
        self.conn.writer.put_f64(value);
        self.finish()
    }

    pub fn send_string(&mut self, value: &str) -> Result<()> {
        self.check_wire_type(WireType::String)?;
        self.conn.writer.put_str(Some(value))?;
        if value == STR_MARKER_NEXT_BYTE_FOLLOWS {
            self.conn.writer.put_u8(EscapeMarker::OriginalValue.as_u8());
        }
        self.finish()
    }

    /// Send a missing value in the encoding of the active column.
    pub fn send_na(&mut self) -> Result<()> {
        let column = self.cursor.active()?;
        let writer = &mut self.conn.writer;
        match self.wire_types[column] {
            WireType::Byte => writer.put_i8(NUM_MARKER_NEXT_BYTE_FOLLOWS as i8),
            WireType::Char => writer.put_u16(NUM_MARKER_NEXT_BYTE_FOLLOWS as u16),
            WireType::Short => writer.put_i16(NUM_MARKER_NEXT_BYTE_FOLLOWS as i16),
            WireType::Int => writer.put_i32(NUM_MARKER_NEXT_BYTE_FOLLOWS as i32),
            WireType::Long => writer.put_i64(NUM_MARKER_NEXT_BYTE_FOLLOWS),
            WireType::Float => writer.put_f32(f32::NAN),
            WireType::Double => writer.put_f64(f64::NAN),
            WireType::String => writer.put_str(Some(STR_MARKER_NEXT_BYTE_FOLLOWS))?,
        }
        if !matches!(self.wire_types[column], WireType::Float | WireType::Double) {
            writer.put_u8(EscapeMarker::Na.as_u8());
        }
        self.finish()
    }

    /// Send a [`Value`]; its variant must match the active column.
    pub fn send_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Na => self.send_na(),
            Value::Byte(v) => self.send_byte(*v),
            Value::Char(v) => self.send_char(*v),
            Value::Short(v) => self.send_short(*v),
            Value::Int(v) => self.send_int(*v),
            Value::Long(v) => self.send_long(*v),
            Value::Float(v) => self.send_float(*v),
            Value::Double(v) => self.send_double(*v),
            Value::Str(v) => self.send_string(v),
        }
    }

    /// Flush outstanding values and block until the backend confirms the
    /// partition is sealed.
    ///
    /// Refuses to finish unless exactly `rows * columns` values were sent;
    /// the backend would otherwise keep waiting for the rest.
    pub fn wait_until_all_written(mut self) -> Result<()> {
        self.cursor.ensure_complete()?;
        self.conn.writer.flush()?;
        let code = self.conn.reader.read_i32()?;
        if code != CONFIRM_WRITING_DONE {
            return Err(ProtocolError::CompletionMismatch {
                expected: CONFIRM_WRITING_DONE,
                actual: code,
            });
        }
        debug!(values = self.cursor.sent(), "ingest confirmed");
        Ok(())
    }

    fn check_wire_type(&self, actual: WireType) -> Result<()> {
        let column = self.cursor.active()?;
        let expected = self.wire_types[column];
        if expected != actual {
            return Err(ProtocolError::WireTypeMismatch {
                column,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Escape a genuine value that collides with the numeric sentinel.
    fn finish_integral(&mut self, value: i64) -> Result<()> {
        if value == NUM_MARKER_NEXT_BYTE_FOLLOWS {
            self.conn
                .writer
                .put_u8(EscapeMarker::OriginalValue.as_u8());
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.cursor.advance();
        self.conn.value_written()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::SessionConfig;

    fn conn_with_reply(reply: i32) -> Connection<Cursor<Vec<u8>>, Vec<u8>> {
        Connection::new(
            Cursor::new(reply.to_le_bytes().to_vec()),
            Vec::new(),
            SessionConfig::default(),
        )
    }

    fn request(wire_types: Vec<WireType>, rows: usize) -> IngestRequest {
        let column_types = vec![ColumnType::Numeric; wire_types.len()];
        IngestRequest::new("k", column_types, wire_types, 3, rows)
    }

    /// Header bytes `create_chunks` writes for `request(..)`.
    fn header_len(columns: usize) -> usize {
        // init + command + key + two arrays + rows + partition
        1 + 4 + (4 + 1) + 2 * (4 + columns) + 4 + 4
    }

    #[test]
    fn header_layout() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let client =
            IngestClient::create_chunks(&mut conn, request(vec![WireType::Int], 0)).unwrap();
        assert_eq!(client.current_column(), None);
        client.wait_until_all_written().unwrap();

        let (_, written) = conn.into_parts();
        let mut expected = vec![INIT_BYTE];
        expected.extend_from_slice(&Command::Ingest.code().to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.push(b'k');
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.push(WireType::Int.tag());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.push(ColumnType::Numeric.code());
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&3i32.to_le_bytes());
        assert_eq!(written, expected);
    }

    #[test]
    fn sentinel_values_are_escaped() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let wire = vec![WireType::Byte, WireType::Short, WireType::String];
        let mut client = IngestClient::create_chunks(&mut conn, request(wire, 2)).unwrap();
        client.send_byte(111).unwrap();
        client.send_short(110).unwrap();
        client.send_string("^").unwrap();
        client.send_na().unwrap();
        client.send_na().unwrap();
        client.send_string("^^").unwrap();
        client.wait_until_all_written().unwrap();

        let (_, written) = conn.into_parts();
        let body = &written[header_len(3)..];
        let mut expected = vec![111, EscapeMarker::OriginalValue.as_u8()];
        expected.extend_from_slice(&110i16.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.push(b'^');
        expected.push(EscapeMarker::OriginalValue.as_u8());
        expected.extend_from_slice(&[111, EscapeMarker::Na.as_u8()]);
        expected.extend_from_slice(&111i16.to_le_bytes());
        expected.push(EscapeMarker::Na.as_u8());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(b"^^");
        assert_eq!(body, expected.as_slice());
    }

    #[test]
    fn missing_reals_travel_as_nan() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let wire = vec![WireType::Float, WireType::Double];
        let mut client = IngestClient::create_chunks(&mut conn, request(wire, 1)).unwrap();
        client.send_na().unwrap();
        client.send_na().unwrap();
        client.wait_until_all_written().unwrap();

        let (_, written) = conn.into_parts();
        let body = &written[header_len(2)..];
        assert_eq!(body.len(), 4 + 8);
        assert!(f32::from_le_bytes(body[..4].try_into().unwrap()).is_nan());
        assert!(f64::from_le_bytes(body[4..].try_into().unwrap()).is_nan());
    }

    #[test]
    fn values_must_match_column_wire_type() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let wire = vec![WireType::Int, WireType::String];
        let mut client = IngestClient::create_chunks(&mut conn, request(wire, 1)).unwrap();
        let err = client.send_string("early").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::WireTypeMismatch {
                column: 0,
                expected: WireType::Int,
                actual: WireType::String,
            }
        ));
        // a rejected value does not move the cursor
        assert_eq!(client.current_column(), Some(0));
        client.send_value(&Value::Int(7)).unwrap();
        assert_eq!(client.current_wire_type(), Some(WireType::String));
        client.send_value(&Value::Str("late".into())).unwrap();
        client.wait_until_all_written().unwrap();
    }

    #[test]
    fn cursor_walks_rows_then_refuses_extra_values() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let wire = vec![WireType::Long, WireType::Long];
        let mut client = IngestClient::create_chunks(&mut conn, request(wire, 2)).unwrap();
        let mut seen = Vec::new();
        while let Some(column) = client.current_column() {
            seen.push(column);
            client.send_long(seen.len() as i64).unwrap();
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
        assert_eq!(client.values_sent(), 4);
        assert!(matches!(
            client.send_long(5),
            Err(ProtocolError::TooManyValues { expected: 4 })
        ));
        client.wait_until_all_written().unwrap();
    }

    #[test]
    fn refuses_to_finish_early() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let wire = vec![WireType::Int, WireType::Int];
        let mut client = IngestClient::create_chunks(&mut conn, request(wire, 1)).unwrap();
        client.send_int(1).unwrap();
        assert!(matches!(
            client.wait_until_all_written(),
            Err(ProtocolError::IncompleteSession {
                expected: 2,
                sent: 1
            })
        ));
    }

    #[test]
    fn wrong_completion_code() {
        let mut conn = conn_with_reply(1);
        let client =
            IngestClient::create_chunks(&mut conn, request(vec![WireType::Byte], 0)).unwrap();
        assert!(matches!(
            client.wait_until_all_written(),
            Err(ProtocolError::CompletionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn malformed_request_sends_nothing() {
        let mut conn = conn_with_reply(CONFIRM_WRITING_DONE);
        let bad = IngestRequest::new("k", vec![ColumnType::Numeric], vec![], 0, 1);
        assert!(IngestClient::create_chunks(&mut conn, bad).is_err());
        let (_, written) = conn.into_parts();
        assert!(written.is_empty());
    }
}
