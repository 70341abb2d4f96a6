//! Wire-type negotiation for exported columns.
//!
//! The choice is a pure function of the column's storage type and, for
//! numeric columns, its rollups. Both ends of an export derive the same
//! array from the same frame metadata.

use extframe_store::{ColumnSummary, ColumnType, FrameInfo};
use extframe_wire::WireType;

/// Narrowest wire type that carries every value in `[min, max]`.
///
/// Bounds are strict: a value equal to a type's extreme selects the next
/// wider type. Integral candidates are tried in the order byte, short, char,
/// int, long; a non-negative range that overflows short but fits the
/// unsigned 16-bit char therefore travels as char. A real range travels as
/// float only when its minimum is above the smallest positive float, so zero
/// or negative minima go out as double.
pub fn classify_numeric(min: f64, max: f64, is_integral: bool) -> WireType {
    let within = |lo: f64, hi: f64| min > lo && max < hi;
    if is_integral {
        if within(i8::MIN as f64, i8::MAX as f64) {
            WireType::Byte
        } else if within(i16::MIN as f64, i16::MAX as f64) {
            WireType::Short
        } else if within(u16::MIN as f64, u16::MAX as f64) {
            WireType::Char
        } else if within(i32::MIN as f64, i32::MAX as f64) {
            WireType::Int
        } else {
            WireType::Long
        }
    } else if within(f64::from(f32::from_bits(1)), f32::MAX as f64) {
        WireType::Float
    } else {
        WireType::Double
    }
}

/// Wire type of one column.
pub fn classify_column(column: &ColumnSummary) -> WireType {
    match column.column_type {
        ColumnType::Bad => WireType::Byte,
        ColumnType::Categorical | ColumnType::Str | ColumnType::Uuid => WireType::String,
        ColumnType::Time => WireType::Long,
        ColumnType::Numeric => {
            let r = column.rollups;
            classify_numeric(r.min, r.max, r.is_integral)
        }
    }
}

/// Wire types of every column of `frame`, in column order.
pub fn prepare_wire_types(frame: &FrameInfo) -> Vec<WireType> {
    frame.columns.iter().map(classify_column).collect()
}
