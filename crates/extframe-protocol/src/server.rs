use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use extframe_store::FrameStore;
use extframe_transport::{connect, Endpoint, IpcStream, Listener};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::dispatch::serve_request;
use crate::error::Result;

/// Accepts protocol connections and serves each on its own thread.
///
/// Sessions on different connections only share the store.
pub struct FrameServer<S> {
    listener: Listener,
    store: Arc<S>,
    config: ServerConfig,
    running: Arc<AtomicBool>,
    next_connection: AtomicU64,
}

/// Stops a running [`FrameServer::serve`] loop from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    endpoint: Endpoint,
}

impl ShutdownHandle {
    /// Stop accepting connections. Sessions already running finish normally.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            // accept() blocks; a throwaway connection wakes it up
            let _ = connect(&self.endpoint);
        }
    }
}

impl<S: FrameStore + 'static> FrameServer<S> {
    /// Bind to `endpoint`. A TCP port of 0 picks a free port; see
    /// [`FrameServer::endpoint`] for the one chosen.
    pub fn bind(endpoint: &Endpoint, store: Arc<S>, config: ServerConfig) -> Result<Self> {
        let listener = Listener::bind(endpoint)?;
        info!(endpoint = %listener.endpoint(), "frame server listening");
        Ok(Self {
            listener,
            store,
            config,
            running: Arc::new(AtomicBool::new(true)),
            next_connection: AtomicU64::new(1),
        })
    }

    /// Endpoint clients should connect to.
    pub fn endpoint(&self) -> &Endpoint {
        self.listener.endpoint()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            endpoint: self.listener.endpoint().clone(),
        }
    }

    /// Accept one connection and serve it on a new thread.
    pub fn accept_one(&self) -> Result<JoinHandle<()>> {
        let stream = self.listener.accept()?;
        self.spawn_session(stream)
    }

    /// Accept connections until [`ShutdownHandle::shutdown`] is called.
    pub fn serve(&self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            let stream = self.listener.accept()?;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.spawn_session(stream)?;
        }
        info!(endpoint = %self.listener.endpoint(), "frame server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: IpcStream) -> Result<JoinHandle<()>> {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        info!(connection = id, peer = %stream.peer_label(), "connection accepted");

        let handle = thread::Builder::new()
            .name(format!("extframe-conn-{id}"))
            .spawn(move || match serve_connection(stream, store.as_ref(), &config) {
                Ok(requests) => debug!(connection = id, requests, "connection closed"),
                Err(err) => warn!(connection = id, error = %err, "session failed"),
            })
            .map_err(extframe_transport::TransportError::Io)?;
        Ok(handle)
    }
}

/// Serve every request on one accepted stream and return how many completed.
///
/// Any error aborts the connection: the stream is shut down so the peer sees
/// EOF rather than a partial response.
pub fn serve_connection<S>(stream: IpcStream, store: &S, config: &ServerConfig) -> Result<usize>
where
    S: FrameStore + ?Sized,
{
    let wire = &config.session.wire;
    stream.set_read_timeout(wire.read_timeout)?;
    stream.set_write_timeout(wire.write_timeout)?;
    let reader = stream.try_clone()?;
    let mut conn = Connection::new(reader, stream, config.session.clone());

    let mut served = 0usize;
    loop {
        match serve_request(&mut conn, store) {
            Ok(Some(summary)) => {
                served += 1;
                debug!(
                    command = %summary.command,
                    frame = %summary.key,
                    partition = summary.partition,
                    "request complete"
                );
                if !config.reuse_connections {
                    return Ok(served);
                }
            }
            Ok(None) => return Ok(served),
            Err(err) => {
                let (_, writer) = conn.into_parts();
                let _ = writer.shutdown();
                return Err(err);
            }
        }
    }
}
