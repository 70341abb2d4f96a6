use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use extframe_protocol::Value;
use extframe_wire::WireType;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document per line.
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Heading for an exported column.
pub fn column_label(index: usize, wire_type: WireType) -> String {
    format!("C{} ({wire_type})", index + 1)
}

/// Print exported rows. `columns` and `wire_types` follow the request order.
pub fn print_rows(
    columns: &[usize],
    wire_types: &[WireType],
    rows: &[Vec<Value>],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(
                    columns
                        .iter()
                        .zip(wire_types)
                        .map(|(&c, &t)| column_label(c, t))
                        .collect::<Vec<_>>(),
                );
            for row in rows {
                table.add_row(row.iter().map(Value::to_string).collect::<Vec<_>>());
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, row) in rows.iter().enumerate() {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(row)
                    .map(|(&c, value)| format!("C{}={value}", c + 1))
                    .collect();
                println!("row {index}: {}", cells.join(" "));
            }
        }
    }
}

#[derive(Serialize)]
pub struct IngestSummary<'a> {
    pub frame: &'a str,
    pub partition: usize,
    pub rows: usize,
    pub columns: usize,
}

pub fn print_ingest_summary(summary: &IngestSummary<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FRAME", "PARTITION", "ROWS", "COLUMNS"])
                .add_row(vec![
                    summary.frame.to_string(),
                    summary.partition.to_string(),
                    summary.rows.to_string(),
                    summary.columns.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "ingested frame={} partition={} rows={} columns={}",
            summary.frame, summary.partition, summary.rows, summary.columns
        ),
    }
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    listening: &'a str,
    transport: &'a str,
}

/// Announce the bound endpoint; scripts read this line to find an ephemeral port.
pub fn print_listening(endpoint: &extframe_transport::Endpoint, format: OutputFormat) {
    let rendered = endpoint.to_string();
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                listening: &rendered,
                transport: endpoint.transport_name(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("listening on {rendered}"),
    }
}
