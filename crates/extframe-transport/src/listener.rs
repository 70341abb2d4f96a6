use std::net::{TcpListener, TcpStream};
#[cfg(unix)]
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Permission mode applied to created socket paths.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// Maximum socket path length (`sockaddr_un.sun_path`).
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// A bound listener accepting protocol connections.
pub struct Listener {
    inner: ListenerInner,
    endpoint: Endpoint,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixSocketGuard),
}

/// Unix listener that removes its socket file on drop, but only if the path
/// still refers to the socket this process created.
#[cfg(unix)]
struct UnixSocketGuard {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
}

impl Listener {
    /// Bind to an endpoint.
    ///
    /// TCP endpoints with port `0` get an ephemeral port; [`Listener::endpoint`]
    /// reports the port actually bound.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let listener =
                    TcpListener::bind((host.as_str(), *port)).map_err(|e| TransportError::Bind {
                        endpoint: endpoint.to_string(),
                        source: e,
                    })?;
                let bound_port = listener
                    .local_addr()
                    .map(|addr| addr.port())
                    .unwrap_or(*port);
                let endpoint = Endpoint::tcp(host.clone(), bound_port);
                info!(%endpoint, "listening on tcp");
                Ok(Self {
                    inner: ListenerInner::Tcp(listener),
                    endpoint,
                })
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let guard = bind_unix(path)?;
                info!(path = ?guard.path, "listening on unix domain socket");
                Ok(Self {
                    inner: ListenerInner::Unix(guard),
                    endpoint: endpoint.clone(),
                })
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Unsupported),
        }
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%addr, "accepted tcp connection");
                Ok(IpcStream::from_tcp(stream))
            }
            #[cfg(unix)]
            ListenerInner::Unix(guard) => {
                let (stream, _addr) = guard.listener.accept().map_err(TransportError::Accept)?;
                debug!("accepted unix connection");
                Ok(IpcStream::from_unix(stream))
            }
        }
    }

    /// The endpoint this listener is bound to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Connect to a listening storage node (blocking).
pub fn connect(endpoint: &Endpoint) -> Result<IpcStream> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream =
                TcpStream::connect((host.as_str(), *port)).map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    source: e,
                })?;
            debug!(%endpoint, "connected over tcp");
            Ok(IpcStream::from_tcp(stream))
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: e,
            })?;
            debug!(?path, "connected to unix domain socket");
            Ok(IpcStream::from_unix(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(TransportError::Unsupported),
    }
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixSocketGuard> {
    let path = path.to_path_buf();
    let bind_err = |source: std::io::Error| TransportError::Bind {
        endpoint: format!("unix:{}", path.display()),
        source,
    };

    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path,
            len,
            max: MAX_PATH_LEN,
        });
    }

    // Remove a stale socket left by a previous node, never a regular file.
    if let Ok(metadata) = std::fs::symlink_metadata(&path) {
        if !metadata.file_type().is_socket() {
            return Err(bind_err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            )));
        }
        debug!(?path, "removing stale socket");
        std::fs::remove_file(&path).map_err(bind_err)?;
    }

    let listener = UnixListener::bind(&path).map_err(bind_err)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(DEFAULT_SOCKET_MODE))
        .map_err(bind_err)?;
    let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

    Ok(UnixSocketGuard {
        listener,
        created_inode: (created.dev(), created.ino()),
        path,
    })
}

#[cfg(unix)]
impl Drop for UnixSocketGuard {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket()
            && (metadata.dev(), metadata.ino()) == self.created_inode
        {
            debug!(path = ?self.path, "cleaning up socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
        }
    }
}
