use std::sync::Arc;

use extframe_protocol::{FrameServer, ServerConfig, ShutdownHandle};
use extframe_store::MemoryStore;
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{protocol_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ServerConfig {
        session: args.session.to_config()?,
        reuse_connections: !args.single_request,
    };
    let store = Arc::new(MemoryStore::new());
    let server = FrameServer::bind(&args.endpoint, Arc::clone(&store), config)
        .map_err(|err| protocol_error("bind failed", err))?;

    install_ctrlc_handler(server.shutdown_handle())?;
    print_listening(server.endpoint(), format);

    server
        .serve()
        .map_err(|err| protocol_error("accept failed", err))?;
    info!(frames = store.frame_keys().len(), "node stopped");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.shutdown()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
