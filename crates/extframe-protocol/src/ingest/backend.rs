use std::io::{Read, Write};

use extframe_store::{ColumnBuilder, ColumnType, FrameStore, Number};
use extframe_wire::{
    EscapeMarker, WireReader, WireType, CONFIRM_WRITING_DONE, NUM_MARKER_NEXT_BYTE_FOLLOWS,
    STR_MARKER_NEXT_BYTE_FOLLOWS,
};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};

/// Header of an ingest request, after the init byte and command code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub key: String,
    /// Storage type of every column of the frame.
    pub column_types: Vec<ColumnType>,
    /// Encoding the client uses for every column.
    pub wire_types: Vec<WireType>,
    pub partition: usize,
    pub total_rows: usize,
}

impl IngestRequest {
    pub fn new(
        key: impl Into<String>,
        column_types: Vec<ColumnType>,
        wire_types: Vec<WireType>,
        partition: usize,
        total_rows: usize,
    ) -> Self {
        Self {
            key: key.into(),
            column_types,
            wire_types,
            partition,
            total_rows,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.wire_types.len()
    }

    /// Values the payload carries: every row of every column.
    pub fn expected_values(&self) -> u64 {
        self.total_rows as u64 * self.num_columns() as u64
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.wire_types.is_empty() {
            return Err(ProtocolError::InvalidRequest("no columns declared".to_string()));
        }
        if self.wire_types.len() != self.column_types.len() {
            return Err(ProtocolError::InvalidRequest(format!(
                "{} wire types for {} columns",
                self.wire_types.len(),
                self.column_types.len()
            )));
        }
        Ok(())
    }

    fn read<R: Read, W: Write>(conn: &mut Connection<R, W>) -> Result<Self> {
        let reader = &mut conn.reader;
        let key = reader
            .read_str()?
            .ok_or_else(|| ProtocolError::InvalidRequest("absent frame key".to_string()))?;
        let wire_tags = reader
            .read_u8_array()?
            .ok_or_else(|| ProtocolError::InvalidRequest("absent wire types".to_string()))?;
        let column_codes = reader
            .read_u8_array()?
            .ok_or_else(|| ProtocolError::InvalidRequest("absent column types".to_string()))?;
        let raw_rows = reader.read_i32()?;
        let raw_partition = reader.read_i32()?;

        let request = Self {
            key,
            wire_types: WireType::decode_all(&wire_tags)?,
            column_types: ColumnType::decode_all(&column_codes)?,
            total_rows: usize::try_from(raw_rows)
                .map_err(|_| ProtocolError::InvalidRowCount(raw_rows))?,
            partition: usize::try_from(raw_partition).map_err(|_| {
                ProtocolError::InvalidRequest(format!("negative partition {raw_partition}"))
            })?,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Receive one partition from the client and seal it.
///
/// Decodes exactly `total_rows * columns` values in row-major order. The
/// partition becomes visible only after the last value; any failure before
/// that drops the builders unsealed. Completion is acknowledged with
/// [`CONFIRM_WRITING_DONE`] once the partition is sealed.
pub fn serve_ingest<R, W, S>(conn: &mut Connection<R, W>, store: &S) -> Result<IngestRequest>
where
    R: Read,
    W: Write,
    S: FrameStore + ?Sized,
{
    let request = IngestRequest::read(conn)?;
    let mut builders =
        store.create_builders(&request.key, &request.column_types, request.partition)?;
    debug!(
        frame = %request.key,
        partition = request.partition,
        rows = request.total_rows,
        columns = request.num_columns(),
        values = request.expected_values(),
        "ingest started"
    );

    for _ in 0..request.total_rows {
        for (builder, &wire_type) in builders.iter_mut().zip(&request.wire_types) {
            read_cell(&mut conn.reader, wire_type, builder)?;
        }
    }

    store.seal_builders(&request.key, request.partition, builders)?;
    conn.writer.put_i32(CONFIRM_WRITING_DONE);
    conn.writer.flush()?;
    debug!(frame = %request.key, partition = request.partition, "ingest sealed");
    Ok(request)
}

/// Decode one escaped value and append it.
fn read_cell<R: Read>(
    reader: &mut WireReader<R>,
    wire_type: WireType,
    builder: &mut ColumnBuilder,
) -> Result<()> {
    let integral = match wire_type {
        WireType::Byte => i64::from(reader.read_i8()?),
        WireType::Char => i64::from(reader.read_u16()?),
        WireType::Short => i64::from(reader.read_i16()?),
        WireType::Int => i64::from(reader.read_i32()?),
        WireType::Long => reader.read_i64()?,
        WireType::Float => return append_real(builder, f64::from(reader.read_f32()?)),
        WireType::Double => return append_real(builder, reader.read_f64()?),
        WireType::String => {
            let value = match reader.read_str()? {
                None => return Ok(builder.append_na()?),
                Some(value) => value,
            };
            if value == STR_MARKER_NEXT_BYTE_FOLLOWS && read_marker(reader)? == EscapeMarker::Na {
                builder.append_na()?;
            } else {
                builder.append_string(value)?;
            }
            return Ok(());
        }
    };

    if integral == NUM_MARKER_NEXT_BYTE_FOLLOWS && read_marker(reader)? == EscapeMarker::Na {
        builder.append_na()?;
    } else {
        builder.append_number(Number::Int(integral))?;
    }
    Ok(())
}

fn append_real(builder: &mut ColumnBuilder, value: f64) -> Result<()> {
    if value.is_nan() {
        builder.append_na()?;
    } else {
        builder.append_number(Number::Real(value))?;
    }
    Ok(())
}

fn read_marker<R: Read>(reader: &mut WireReader<R>) -> Result<EscapeMarker> {
    Ok(EscapeMarker::try_from(reader.read_u8()?)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use extframe_store::MemoryStore;
    use extframe_wire::WireWriter;

    use super::*;
    use crate::config::SessionConfig;

    fn header(
        writer: &mut WireWriter<Vec<u8>>,
        key: &str,
        wire: &[WireType],
        columns: &[ColumnType],
        rows: i32,
        partition: i32,
    ) {
        writer.put_str(Some(key)).unwrap();
        writer
            .put_u8_array(Some(&WireType::encode_all(wire)))
            .unwrap();
        writer
            .put_u8_array(Some(&ColumnType::encode_all(columns)))
            .unwrap();
        writer.put_i32(rows);
        writer.put_i32(partition);
    }

    fn run(payload: WireWriter<Vec<u8>>, store: &MemoryStore) -> (Result<IngestRequest>, Vec<u8>) {
        let mut payload = payload;
        payload.flush().unwrap();
        let mut conn = Connection::new(
            Cursor::new(payload.into_inner()),
            Vec::new(),
            SessionConfig::default(),
        );
        let result = serve_ingest(&mut conn, store);
        let (_, written) = conn.into_parts();
        (result, written)
    }

    #[test]
    fn decodes_escaped_integrals() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(
            &mut w,
            "ints",
            &[WireType::Byte, WireType::Long],
            &[ColumnType::Numeric, ColumnType::Time],
            3,
            0,
        );
        // row 0: genuine 111 in both columns
        w.put_i8(111);
        w.put_u8(EscapeMarker::OriginalValue.as_u8());
        w.put_i64(111);
        w.put_u8(EscapeMarker::OriginalValue.as_u8());
        // row 1: NA, plain value
        w.put_i8(111);
        w.put_u8(EscapeMarker::Na.as_u8());
        w.put_i64(1_700_000_000_000);
        // row 2: plain value, NA
        w.put_i8(-4);
        w.put_i64(111);
        w.put_u8(EscapeMarker::Na.as_u8());

        let (result, written) = run(w, &store);
        let request = result.unwrap();
        assert_eq!(request.total_rows, 3);
        assert_eq!(written, CONFIRM_WRITING_DONE.to_le_bytes().to_vec());

        let chunks = store.get_chunks("ints", 0).unwrap();
        assert_eq!(chunks[0].int_value(0), Some(111));
        assert!(chunks[0].is_na(1));
        assert_eq!(chunks[0].int_value(2), Some(-4));
        assert_eq!(chunks[1].int_value(0), Some(111));
        assert_eq!(chunks[1].int_value(1), Some(1_700_000_000_000));
        assert!(chunks[1].is_na(2));
    }

    #[test]
    fn decodes_strings_and_reals() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(
            &mut w,
            "mixed",
            &[WireType::String, WireType::Double, WireType::Float],
            &[ColumnType::Str, ColumnType::Numeric, ColumnType::Numeric],
            2,
            4,
        );
        w.put_str(Some("^")).unwrap();
        w.put_u8(EscapeMarker::OriginalValue.as_u8());
        w.put_f64(f64::NAN);
        w.put_f32(1.25);
        w.put_str(Some("^")).unwrap();
        w.put_u8(EscapeMarker::Na.as_u8());
        w.put_f64(-3.5);
        w.put_f32(f32::NAN);

        let (result, _) = run(w, &store);
        result.unwrap();
        let chunks = store.get_chunks("mixed", 4).unwrap();
        assert_eq!(chunks[0].str_value(0), Some("^"));
        assert!(chunks[0].is_na(1));
        assert!(chunks[1].is_na(0));
        assert_eq!(chunks[1].float_value(1), Some(-3.5));
        assert_eq!(chunks[2].float_value(0), Some(1.25));
        assert!(chunks[2].is_na(1));
    }

    #[test]
    fn absent_string_is_missing() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(&mut w, "s", &[WireType::String], &[ColumnType::Str], 1, 0);
        w.put_str(None).unwrap();

        let (result, _) = run(w, &store);
        result.unwrap();
        assert!(store.get_chunks("s", 0).unwrap()[0].is_na(0));
    }

    #[test]
    fn consumes_every_column_of_every_row() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(
            &mut w,
            "grid",
            &[WireType::Short, WireType::Short, WireType::Short],
            &[ColumnType::Numeric; 3],
            2,
            0,
        );
        for v in 0..6i16 {
            w.put_i16(v);
        }

        let (result, written) = run(w, &store);
        assert_eq!(result.unwrap().expected_values(), 6);
        assert_eq!(written.len(), 4);
        let chunks = store.get_chunks("grid", 0).unwrap();
        assert_eq!(chunks[2].int_value(1), Some(5));
        assert_eq!(chunks[0].len(), 2);
    }

    #[test]
    fn truncated_payload_leaves_partition_unsealed() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(&mut w, "cut", &[WireType::Int; 2], &[ColumnType::Numeric; 2], 2, 0);
        w.put_i32(1);
        w.put_i32(2);
        w.put_i32(3);

        let (result, written) = run(w, &store);
        assert!(matches!(
            result,
            Err(ProtocolError::Wire(extframe_wire::WireError::ConnectionClosed))
        ));
        assert!(written.is_empty());
        assert!(store.get_chunks("cut", 0).is_err());
    }

    #[test]
    fn invalid_marker_is_fatal() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(&mut w, "m", &[WireType::Char], &[ColumnType::Numeric], 1, 0);
        w.put_u16(111);
        w.put_u8(9);

        let (result, written) = run(w, &store);
        assert!(matches!(
            result,
            Err(ProtocolError::Wire(extframe_wire::WireError::InvalidMarker(9)))
        ));
        assert!(written.is_empty());
        assert!(store.get_chunks("m", 0).is_err());
    }

    #[test]
    fn unknown_type_codes_rejected() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        w.put_str(Some("t")).unwrap();
        w.put_u8_array(Some(&[12])).unwrap();
        w.put_u8_array(Some(&[3])).unwrap();
        w.put_i32(1);
        w.put_i32(0);
        let (result, _) = run(w, &store);
        assert!(matches!(
            result,
            Err(ProtocolError::Wire(extframe_wire::WireError::UnknownWireType(12)))
        ));

        let mut w = WireWriter::new(Vec::new());
        w.put_str(Some("t")).unwrap();
        w.put_u8_array(Some(&[0])).unwrap();
        w.put_u8_array(Some(&[6])).unwrap();
        w.put_i32(1);
        w.put_i32(0);
        let (result, _) = run(w, &store);
        assert!(matches!(
            result,
            Err(ProtocolError::Store(extframe_store::StoreError::UnknownColumnType(6)))
        ));
    }

    #[test]
    fn header_arrays_must_agree() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(
            &mut w,
            "x",
            &[WireType::Byte, WireType::Byte],
            &[ColumnType::Numeric],
            1,
            0,
        );
        let (result, _) = run(w, &store);
        assert!(matches!(result, Err(ProtocolError::InvalidRequest(_))));
        assert!(store.resolve_frame("x").is_none());
    }

    #[test]
    fn value_rejected_by_column_type_is_fatal() {
        let store = MemoryStore::new();
        let mut w = WireWriter::new(Vec::new());
        header(&mut w, "u", &[WireType::String], &[ColumnType::Uuid], 1, 0);
        w.put_str(Some("not-a-uuid")).unwrap();

        let (result, _) = run(w, &store);
        assert!(matches!(
            result,
            Err(ProtocolError::Store(extframe_store::StoreError::InvalidUuid { .. }))
        ));
        assert!(store.get_chunks("u", 0).is_err());
    }
}
