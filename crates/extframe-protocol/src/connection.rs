use std::io::{Read, Write};

use extframe_wire::{WireReader, WireWriter};

use crate::config::SessionConfig;

/// Both halves of a duplex stream, each with its own buffer.
///
/// One side of every session (client or backend) works through a
/// `Connection`. Sessions borrow it mutably and release it when they finish,
/// so a connection can carry several consecutive requests.
pub struct Connection<R, W> {
    pub(crate) reader: WireReader<R>,
    pub(crate) writer: WireWriter<W>,
    pub(crate) config: SessionConfig,
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Wrap separate read and write handles of the same stream.
    pub fn new(reader: R, writer: W, config: SessionConfig) -> Self {
        Self {
            reader: WireReader::with_config(reader, config.wire.clone()),
            writer: WireWriter::with_config(writer, config.wire.clone()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn reader_mut(&mut self) -> &mut WireReader<R> {
        &mut self.reader
    }

    pub fn writer_mut(&mut self) -> &mut WireWriter<W> {
        &mut self.writer
    }

    /// Release the underlying handles. Unflushed output is dropped.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    /// Flush according to the session's policy after one value was appended.
    pub(crate) fn value_written(&mut self) -> crate::Result<()> {
        self.config.flush.after_value(&mut self.writer)
    }
}

impl<R, W> std::fmt::Debug for Connection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
