use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use extframe_protocol::{FlushPolicy, SessionConfig};
use extframe_store::ColumnType;
use extframe_transport::Endpoint;
use extframe_wire::WireType;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod export;
pub mod ingest;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a storage node backed by memory until interrupted.
    Serve(ServeArgs),
    /// Stream JSON rows into a new partition.
    Ingest(IngestArgs),
    /// Print the selected columns of one partition.
    Export(ExportArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Ingest(args) => ingest::run(args, format),
        Command::Export(args) => export::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Stream settings shared by every command that opens sessions.
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Buffer output and flush once this many bytes are pending, instead of
    /// after every value.
    #[arg(long, value_name = "BYTES")]
    pub flush_threshold: Option<usize>,
    /// Read/write timeout on the stream (e.g. 30s, 500ms). Default: none.
    #[arg(long)]
    pub timeout: Option<String>,
}

impl SessionArgs {
    pub fn to_config(&self) -> CliResult<SessionConfig> {
        let mut config = SessionConfig::default();
        if let Some(threshold) = self.flush_threshold {
            if threshold == 0 {
                return Err(CliError::usage("--flush-threshold must be greater than zero"));
            }
            config.flush = FlushPolicy::Batched { threshold };
        }
        if let Some(timeout) = &self.timeout {
            let timeout = parse_duration(timeout)?;
            config.wire.read_timeout = Some(timeout);
            config.wire.write_timeout = Some(timeout);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Endpoint to listen on: `host:port` or `unix:<path>`.
    #[arg(env = "EXTFRAME_LISTEN", default_value = "127.0.0.1:54321")]
    pub endpoint: Endpoint,
    /// Close each connection after its first request.
    #[arg(long)]
    pub single_request: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Node endpoint: `host:port` or `unix:<path>`.
    pub endpoint: Endpoint,
    /// Frame key.
    #[arg(long)]
    pub frame: String,
    /// Partition index to create.
    #[arg(long)]
    pub partition: usize,
    /// Storage type of every column (comma-separated: numeric, str, categorical, uuid, time, bad).
    #[arg(long, value_delimiter = ',', required = true)]
    pub column_types: Vec<ColumnType>,
    /// Encoding of every column (comma-separated). Default: derived from the column types.
    #[arg(long, value_delimiter = ',')]
    pub wire_types: Option<Vec<WireType>>,
    /// Read rows from a file instead of stdin. One JSON array per line; `null` is missing.
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Node endpoint: `host:port` or `unix:<path>`.
    pub endpoint: Endpoint,
    /// Frame key.
    #[arg(long)]
    pub frame: String,
    /// Partition index to read.
    #[arg(long)]
    pub partition: usize,
    /// Zero-based column indices, in output order (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<usize>,
    /// Wire type the node uses for each selected column (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub wire_types: Vec<WireType>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
