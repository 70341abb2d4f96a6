use std::io::Write;

use extframe_wire::{WireConfig, WireWriter};

use crate::error::Result;

/// Default batch size for [`FlushPolicy::Batched`]: 64 KiB.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64 * 1024;

/// When a session drains its outbound buffer onto the stream.
///
/// Every handshake point (row count, completion code) is flushed regardless
/// of policy. The bytes on the wire are identical under both policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush after every value.
    #[default]
    PerValue,
    /// Flush once at least `threshold` bytes are pending.
    Batched { threshold: usize },
}

impl FlushPolicy {
    pub fn batched() -> Self {
        Self::Batched {
            threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    /// Flush `writer` if the policy calls for it after a value was appended.
    pub fn after_value<W: Write>(self, writer: &mut WireWriter<W>) -> Result<()> {
        let due = match self {
            Self::PerValue => true,
            Self::Batched { threshold } => writer.pending() >= threshold,
        };
        if due {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Per-session settings shared by clients and backends.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub wire: WireConfig,
    pub flush: FlushPolicy,
}

impl SessionConfig {
    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }
}

/// Settings for [`crate::FrameServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub session: SessionConfig,
    /// Serve consecutive requests on one connection, each introduced by the
    /// init byte, until the client closes it.
    pub reuse_connections: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            reuse_connections: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn per_value_flushes_immediately() {
        let mut writer = WireWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.put_i32(5);
        FlushPolicy::PerValue
            .after_value(&mut writer)
            .expect("flush should succeed");
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.get_ref().get_ref().len(), 4);
    }

    #[test]
    fn batched_waits_for_threshold() {
        let policy = FlushPolicy::Batched { threshold: 8 };
        let mut writer = WireWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.put_i32(1);
        policy.after_value(&mut writer).expect("no flush expected");
        assert_eq!(writer.pending(), 4);

        writer.put_i32(2);
        policy.after_value(&mut writer).expect("flush should succeed");
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.get_ref().get_ref().len(), 8);
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert!(config.reuse_connections);
        assert_eq!(config.session.flush, FlushPolicy::PerValue);
        assert_eq!(
            SessionConfig::default().with_flush(FlushPolicy::batched()).flush,
            FlushPolicy::Batched {
                threshold: DEFAULT_FLUSH_THRESHOLD
            }
        );
    }
}
