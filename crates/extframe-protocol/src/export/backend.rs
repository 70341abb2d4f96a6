use std::io::{Read, Write};

use extframe_store::{Chunk, ColumnType, FrameStore};
use extframe_wire::{WireType, WireWriter, CONFIRM_READING_DONE, IS_NA, NOT_NA};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};
use crate::negotiate::prepare_wire_types;

/// Header of an export request, after the init byte and command code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub key: String,
    pub partition: usize,
    /// Columns to stream, in the order the client will read them.
    pub columns: Vec<usize>,
}

impl ExportRequest {
    fn read<R: Read, W: Write>(conn: &mut Connection<R, W>) -> Result<Self> {
        let key = conn
            .reader
            .read_str()?
            .ok_or_else(|| ProtocolError::InvalidRequest("absent frame key".to_string()))?;
        let raw_partition = conn.reader.read_i32()?;
        let partition = usize::try_from(raw_partition).map_err(|_| {
            ProtocolError::InvalidRequest(format!("negative partition {raw_partition}"))
        })?;
        let selected = conn.reader.read_i32_array()?.ok_or_else(|| {
            ProtocolError::InvalidRequest("absent selected column list".to_string())
        })?;
        let columns = selected
            .into_iter()
            .map(|index| {
                usize::try_from(index).map_err(|_| ProtocolError::ColumnOutOfRange {
                    index,
                    columns: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            key,
            partition,
            columns,
        })
    }
}

/// Stream one partition to the client.
///
/// Reads the request header, answers with the row count, then every selected
/// cell row by row, and finishes with [`CONFIRM_READING_DONE`]. An unknown
/// frame fails before anything is written.
pub fn serve_export<R, W, S>(conn: &mut Connection<R, W>, store: &S) -> Result<ExportRequest>
where
    R: Read,
    W: Write,
    S: FrameStore + ?Sized,
{
    let request = ExportRequest::read(conn)?;
    let frame = store
        .resolve_frame(&request.key)
        .ok_or_else(|| ProtocolError::FrameNotFound(request.key.clone()))?;
    let num_columns = frame.num_columns();
    if let Some(&bad) = request.columns.iter().find(|&&c| c >= num_columns) {
        return Err(ProtocolError::ColumnOutOfRange {
            index: i32::try_from(bad).unwrap_or(i32::MAX),
            columns: num_columns,
        });
    }

    let chunks = store.get_chunks(&request.key, request.partition)?;
    let wire_types = prepare_wire_types(&frame);
    let rows = chunks.first().map(Chunk::len).unwrap_or(0);
    let wire_rows = i32::try_from(rows)
        .map_err(|_| ProtocolError::InvalidRequest(format!("partition holds {rows} rows")))?;
    debug!(
        frame = %request.key,
        partition = request.partition,
        rows,
        columns = request.columns.len(),
        "export started"
    );

    conn.writer.put_i32(wire_rows);
    conn.writer.flush()?;

    for row in 0..rows {
        for &column in &request.columns {
            let chunk = &chunks[column];
            if chunk.is_na(row) {
                conn.writer.put_u8(IS_NA);
            } else {
                conn.writer.put_u8(NOT_NA);
                write_cell(&mut conn.writer, chunk, row, column, wire_types[column])?;
            }
            conn.value_written()?;
        }
    }

    conn.writer.put_u8(CONFIRM_READING_DONE);
    conn.writer.flush()?;
    debug!(frame = %request.key, partition = request.partition, "export finished");
    Ok(request)
}

fn write_cell<W: Write>(
    writer: &mut WireWriter<W>,
    chunk: &Chunk,
    row: usize,
    column: usize,
    wire_type: WireType,
) -> Result<()> {
    let unreadable = || ProtocolError::UnreadableCell {
        column,
        row,
        wire_type,
    };
    match wire_type {
        WireType::Byte => writer.put_i8(chunk.int_value(row).ok_or_else(unreadable)? as i8),
        WireType::Char => writer.put_u16(chunk.int_value(row).ok_or_else(unreadable)? as u16),
        WireType::Short => writer.put_i16(chunk.int_value(row).ok_or_else(unreadable)? as i16),
        WireType::Int => writer.put_i32(chunk.int_value(row).ok_or_else(unreadable)? as i32),
        WireType::Long => writer.put_i64(chunk.int_value(row).ok_or_else(unreadable)?),
        WireType::Float => writer.put_f32(chunk.float_value(row).ok_or_else(unreadable)? as f32),
        WireType::Double => writer.put_f64(chunk.float_value(row).ok_or_else(unreadable)?),
        WireType::String => {
            let text = match chunk.column_type() {
                ColumnType::Categorical => chunk.label(row).map(str::to_string),
                ColumnType::Str => chunk.str_value(row).map(str::to_string),
                ColumnType::Uuid => chunk.uuid_value(row).map(|id| id.hyphenated().to_string()),
                _ => None,
            };
            writer.put_str(Some(&text.ok_or_else(unreadable)?))?;
        }
    }
    Ok(())
}
