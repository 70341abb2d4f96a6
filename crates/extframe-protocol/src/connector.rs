use extframe_transport::{Endpoint, IpcStream};
use tracing::debug;

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::error::Result;

/// A client connection over the transport's stream type.
pub type ClientConnection = Connection<IpcStream, IpcStream>;

/// Connect to a storage node with default session settings.
pub fn connect(endpoint: &Endpoint) -> Result<ClientConnection> {
    connect_with_config(endpoint, SessionConfig::default())
}

/// Connect with explicit session settings.
///
/// The stream is split into independent read and write handles so the
/// session's inbound and outbound buffers never share state.
pub fn connect_with_config(endpoint: &Endpoint, config: SessionConfig) -> Result<ClientConnection> {
    let stream = extframe_transport::connect(endpoint)?;
    stream.set_read_timeout(config.wire.read_timeout)?;
    stream.set_write_timeout(config.wire.write_timeout)?;
    let reader = stream.try_clone()?;
    debug!(endpoint = %endpoint, "connected");
    Ok(Connection::new(reader, stream, config))
}
