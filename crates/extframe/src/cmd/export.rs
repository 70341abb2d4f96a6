use extframe_protocol::{connect_with_config, ExportClient};

use crate::cmd::ExportArgs;
use crate::exit::{protocol_error, CliError, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

pub fn run(args: ExportArgs, format: OutputFormat) -> CliResult<i32> {
    if args.wire_types.len() != args.columns.len() {
        return Err(CliError::usage(format!(
            "{} wire types given for {} columns",
            args.wire_types.len(),
            args.columns.len()
        )));
    }
    let config = args.session.to_config()?;
    let mut conn = connect_with_config(&args.endpoint, config)
        .map_err(|err| protocol_error("connect failed", err))?;

    let mut client = ExportClient::open(&mut conn, &args.frame, args.partition, &args.columns)
        .map_err(|err| protocol_error("export request failed", err))?;
    let mut rows = Vec::with_capacity(client.num_rows());
    for _ in 0..client.num_rows() {
        let row = client
            .read_row(&args.wire_types)
            .map_err(|err| protocol_error("receive failed", err))?;
        rows.push(row);
    }
    client
        .wait_until_all_received()
        .map_err(|err| protocol_error("completion failed", err))?;

    print_rows(&args.columns, &args.wire_types, &rows, format);
    Ok(SUCCESS)
}
