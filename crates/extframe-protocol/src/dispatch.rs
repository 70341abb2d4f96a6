use std::io::{Read, Write};

use extframe_store::FrameStore;
use extframe_wire::{Command, INIT_BYTE};

use crate::connection::Connection;
use crate::error::{ProtocolError, Result};
use crate::export::serve_export;
use crate::ingest::serve_ingest;

/// What a finished request did, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub command: Command,
    pub key: String,
    pub partition: usize,
}

/// Read the 4-byte command code and run the matching backend.
///
/// The stream must be positioned right after the init byte. An unknown code
/// is fatal for the stream.
pub fn dispatch<R, W, S>(conn: &mut Connection<R, W>, store: &S) -> Result<RequestSummary>
where
    R: Read,
    W: Write,
    S: FrameStore + ?Sized,
{
    let command = Command::try_from(conn.reader.read_i32()?)?;
    let (key, partition) = match command {
        Command::Export => {
            let request = serve_export(conn, store)?;
            (request.key, request.partition)
        }
        Command::Ingest => {
            let request = serve_ingest(conn, store)?;
            (request.key, request.partition)
        }
    };
    Ok(RequestSummary {
        command,
        key,
        partition,
    })
}

/// Serve the next request on `conn`.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly instead of
/// sending another init byte.
pub fn serve_request<R, W, S>(
    conn: &mut Connection<R, W>,
    store: &S,
) -> Result<Option<RequestSummary>>
where
    R: Read,
    W: Write,
    S: FrameStore + ?Sized,
{
    match conn.reader.try_read_u8()? {
        None => Ok(None),
        Some(INIT_BYTE) => dispatch(conn, store).map(Some),
        Some(actual) => Err(ProtocolError::BadInitByte {
            expected: INIT_BYTE,
            actual,
        }),
    }
}
