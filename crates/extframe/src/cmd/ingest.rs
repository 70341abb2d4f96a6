use std::fs;
use std::io::Read;

use extframe_protocol::{connect_with_config, IngestClient, IngestRequest, Value};
use extframe_store::ColumnType;
use extframe_wire::WireType;
use tracing::debug;

use crate::cmd::IngestArgs;
use crate::exit::{io_error, protocol_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_ingest_summary, IngestSummary, OutputFormat};

pub fn run(args: IngestArgs, format: OutputFormat) -> CliResult<i32> {
    let wire_types = match &args.wire_types {
        Some(types) if types.len() != args.column_types.len() => {
            return Err(CliError::usage(format!(
                "{} wire types given for {} columns",
                types.len(),
                args.column_types.len()
            )));
        }
        Some(types) => types.clone(),
        None => args.column_types.iter().map(|&t| default_wire_type(t)).collect(),
    };

    let text = read_input(&args)?;
    let rows = parse_rows(&text, &wire_types)?;
    debug!(rows = rows.len(), "rows parsed");

    let config = args.session.to_config()?;
    let mut conn = connect_with_config(&args.endpoint, config)
        .map_err(|err| protocol_error("connect failed", err))?;
    let request = IngestRequest::new(
        args.frame.as_str(),
        args.column_types.clone(),
        wire_types,
        args.partition,
        rows.len(),
    );
    let mut client = IngestClient::create_chunks(&mut conn, request)
        .map_err(|err| protocol_error("ingest request failed", err))?;
    for value in rows.iter().flatten() {
        client
            .send_value(value)
            .map_err(|err| protocol_error("send failed", err))?;
    }
    client
        .wait_until_all_written()
        .map_err(|err| protocol_error("completion failed", err))?;

    print_ingest_summary(
        &IngestSummary {
            frame: &args.frame,
            partition: args.partition,
            rows: rows.len(),
            columns: args.column_types.len(),
        },
        format,
    );
    Ok(SUCCESS)
}

/// Encoding used when the caller does not choose one.
fn default_wire_type(column_type: ColumnType) -> WireType {
    match column_type {
        ColumnType::Numeric => WireType::Double,
        ColumnType::Time => WireType::Long,
        ColumnType::Bad => WireType::Byte,
        ColumnType::Uuid | ColumnType::Str | ColumnType::Categorical => WireType::String,
    }
}

fn read_input(args: &IngestArgs) -> CliResult<String> {
    match &args.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(text)
        }
    }
}

/// One JSON array per non-blank line, one element per column.
fn parse_rows(text: &str, wire_types: &[WireType]) -> CliResult<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invalid = |message: String| {
            CliError::new(DATA_INVALID, format!("line {}: {message}", number + 1))
        };
        let cells: Vec<serde_json::Value> =
            serde_json::from_str(line).map_err(|err| invalid(err.to_string()))?;
        if cells.len() != wire_types.len() {
            return Err(invalid(format!(
                "{} values for {} columns",
                cells.len(),
                wire_types.len()
            )));
        }
        let row = cells
            .iter()
            .zip(wire_types)
            .enumerate()
            .map(|(column, (cell, &wire_type))| {
                json_cell(cell, wire_type).map_err(|m| invalid(format!("column {}: {m}", column + 1)))
            })
            .collect::<CliResult<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Convert one JSON value to the wire encoding of its column.
fn json_cell(cell: &serde_json::Value, wire_type: WireType) -> Result<Value, String> {
    use serde_json::Value as Json;

    if cell.is_null() {
        return Ok(Value::Na);
    }
    let out_of_range = || format!("{cell} does not fit {wire_type}");
    let integer = || match cell {
        Json::Bool(b) => Ok(i64::from(*b)),
        Json::Number(n) => n.as_i64().ok_or_else(|| format!("{cell} is not an integer")),
        _ => Err(format!("expected an integer, got {cell}")),
    };

    Ok(match wire_type {
        WireType::Byte => Value::Byte(i8::try_from(integer()?).map_err(|_| out_of_range())?),
        WireType::Char => Value::Char(u16::try_from(integer()?).map_err(|_| out_of_range())?),
        WireType::Short => Value::Short(i16::try_from(integer()?).map_err(|_| out_of_range())?),
        WireType::Int => Value::Int(i32::try_from(integer()?).map_err(|_| out_of_range())?),
        WireType::Long => Value::Long(integer()?),
        WireType::Float | WireType::Double => {
            let real = cell
                .as_f64()
                .ok_or_else(|| format!("expected a number, got {cell}"))?;
            if wire_type == WireType::Float {
                Value::Float(real as f32)
            } else {
                Value::Double(real)
            }
        }
        WireType::String => match cell {
            Json::String(s) => Value::Str(s.clone()),
            _ => return Err(format!("expected a string, got {cell}")),
        },
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_is_missing_for_every_type() {
        for wire_type in WireType::ALL {
            assert_eq!(json_cell(&json!(null), wire_type).unwrap(), Value::Na);
        }
    }

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(json_cell(&json!(-128), WireType::Byte).unwrap(), Value::Byte(-128));
        assert!(json_cell(&json!(128), WireType::Byte).is_err());
        assert_eq!(json_cell(&json!(65535), WireType::Char).unwrap(), Value::Char(65535));
        assert!(json_cell(&json!(-1), WireType::Char).is_err());
        assert!(json_cell(&json!(1.5), WireType::Int).is_err());
        assert_eq!(json_cell(&json!(true), WireType::Byte).unwrap(), Value::Byte(1));
    }

    #[test]
    fn reals_and_strings() {
        assert_eq!(json_cell(&json!(2), WireType::Double).unwrap(), Value::Double(2.0));
        assert_eq!(json_cell(&json!(0.5), WireType::Float).unwrap(), Value::Float(0.5));
        assert_eq!(
            json_cell(&json!("^"), WireType::String).unwrap(),
            Value::Str("^".to_string())
        );
        assert!(json_cell(&json!(3), WireType::String).is_err());
    }

    #[test]
    fn parse_rows_skips_blank_lines_and_checks_width() {
        let wire = [WireType::Int, WireType::String];
        let rows = parse_rows("[1, \"a\"]\n\n[null, null]\n", &wire).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(1), Value::Str("a".to_string())],
                vec![Value::Na, Value::Na]
            ]
        );

        let err = parse_rows("[1]\n", &wire).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("line 1:"));

        let err = parse_rows("[1, \"a\"]\n[\"x\", \"b\"]\n", &wire).unwrap_err();
        assert!(err.message.starts_with("line 2: column 1:"));
    }

    #[test]
    fn wire_defaults_follow_column_types() {
        assert_eq!(default_wire_type(ColumnType::Numeric), WireType::Double);
        assert_eq!(default_wire_type(ColumnType::Categorical), WireType::String);
        assert_eq!(default_wire_type(ColumnType::Time), WireType::Long);
    }
}
