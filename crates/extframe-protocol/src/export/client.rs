use std::io::{Read, Write};

use extframe_wire::{Command, WireType, CONFIRM_READING_DONE, INIT_BYTE, IS_NA, NOT_NA};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};
use crate::value::Value;

/// Client side of an export session.
///
/// Construction sends the request and blocks until the row count arrives.
/// The caller then reads, for every row and every selected column, the NA
/// flag and (when present) the value with the column's wire type, and
/// finally calls [`ExportClient::wait_until_all_received`].
pub struct ExportClient<'a, R, W> {
    conn: &'a mut Connection<R, W>,
    num_rows: usize,
}

impl<'a, R: Read, W: Write> ExportClient<'a, R, W> {
    pub fn open(
        conn: &'a mut Connection<R, W>,
        key: &str,
        partition: usize,
        columns: &[usize],
    ) -> Result<Self> {
        let partition = i32::try_from(partition)
            .map_err(|_| ProtocolError::InvalidRequest(format!("partition {partition} too large")))?;
        let columns = columns
            .iter()
            .map(|&c| {
                i32::try_from(c).map_err(|_| {
                    ProtocolError::InvalidRequest(format!("column index {c} too large"))
                })
            })
            .collect::<Result<Vec<i32>>>()?;

        conn.writer.put_u8(INIT_BYTE);
        conn.writer.put_i32(Command::Export.code());
        conn.writer.put_str(Some(key))?;
        conn.writer.put_i32(partition);
        conn.writer.put_i32_array(Some(&columns))?;
        conn.writer.flush()?;

        let raw_rows = conn.reader.read_i32()?;
        let num_rows =
            usize::try_from(raw_rows).map_err(|_| ProtocolError::InvalidRowCount(raw_rows))?;
        debug!(frame = key, partition, rows = num_rows, "export opened");
        Ok(Self { conn, num_rows })
    }

    /// Rows in the partition.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Read the NA flag preceding every cell.
    pub fn read_is_na(&mut self) -> Result<bool> {
        match self.conn.reader.read_u8()? {
            IS_NA => Ok(true),
            NOT_NA => Ok(false),
            other => Err(extframe_wire::WireError::InvalidNaFlag(other).into()),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.conn.reader.read_bool()?)
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        Ok(self.conn.reader.read_i8()?)
    }

    pub fn read_char(&mut self) -> Result<u16> {
        Ok(self.conn.reader.read_u16()?)
    }

    pub fn read_short(&mut self) -> Result<i16> {
        Ok(self.conn.reader.read_i16()?)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        Ok(self.conn.reader.read_i32()?)
    }

    pub fn read_long(&mut self) -> Result<i64> {
        Ok(self.conn.reader.read_i64()?)
    }

    pub fn read_float(&mut self) -> Result<f32> {
        Ok(self.conn.reader.read_f32()?)
    }

    pub fn read_double(&mut self) -> Result<f64> {
        Ok(self.conn.reader.read_f64()?)
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.conn.reader.read_str()?.ok_or(ProtocolError::AbsentValue)
    }

    /// Time columns travel as epoch milliseconds.
    pub fn read_time_millis(&mut self) -> Result<i64> {
        self.read_long()
    }

    /// Read one cell (NA flag and value) of the given wire type.
    pub fn read_cell(&mut self, wire_type: WireType) -> Result<Value> {
        if self.read_is_na()? {
            return Ok(Value::Na);
        }
        Ok(match wire_type {
            WireType::Byte => Value::Byte(self.read_byte()?),
            WireType::Char => Value::Char(self.read_char()?),
            WireType::Short => Value::Short(self.read_short()?),
            WireType::Int => Value::Int(self.read_int()?),
            WireType::Long => Value::Long(self.read_long()?),
            WireType::Float => Value::Float(self.read_float()?),
            WireType::Double => Value::Double(self.read_double()?),
            WireType::String => Value::Str(self.read_string()?),
        })
    }

    /// Read one row; `wire_types` lists the selected columns' types in
    /// request order.
    pub fn read_row(&mut self, wire_types: &[WireType]) -> Result<Vec<Value>> {
        wire_types.iter().map(|&t| self.read_cell(t)).collect()
    }

    /// Block until the completion byte arrives and check it.
    ///
    /// Consumes the client: it must be called exactly once, after every value
    /// was read. The connection is free for the next request afterwards.
    pub fn wait_until_all_received(mut self) -> Result<()> {
        let code = self.conn.reader.read_u8()?;
        if code != CONFIRM_READING_DONE {
            return Err(ProtocolError::CompletionMismatch {
                expected: i32::from(CONFIRM_READING_DONE),
                actual: i32::from(code),
            });
        }
        debug!(rows = self.num_rows, "export complete");
        Ok(())
    }
}
