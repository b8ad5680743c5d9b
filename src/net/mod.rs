//! TCP listener
//!
//! The accept loop is the only shared point between connections. Each
//! accepted stream is moved to its own thread, which alone is responsible
//! for closing it.

use crate::config::{ConfigError, ServerConfig};
use crate::http::session::FdSessionOps;
use crate::http::{Connection, ConnectionState, Handler};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, info_span};

/// Pending connection queue length
pub const LISTEN_BACKLOG: i32 = 1024;

/// Result type for listener operations
pub type Result<T> = std::result::Result<T, Error>;

/// Listener errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),

    #[error("Failed to spawn connection thread: {0}")]
    Spawn(#[source] io::Error),
}

fn bind_socket(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

/// Listening socket plus the per-connection settings
pub struct Listener {
    inner: TcpListener,
    read_timeout: Option<Duration>,
    reject_malformed: bool,
}

impl Listener {
    /// Bind the configured address
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let inner = bind_socket(addr).map_err(|source| Error::Bind { addr, source })?;

        info!(
            address = %inner.local_addr().unwrap_or(addr),
            read_timeout = ?config.read_timeout,
            "Listener bound"
        );

        Ok(Listener {
            inner,
            read_timeout: config.read_timeout,
            reject_malformed: config.reject_malformed,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept one connection and hand it to its own thread
    ///
    /// Returns without waiting for the connection to finish; the handle
    /// yields the connection's terminal state.
    pub fn accept<H>(&self, handler: &Arc<H>) -> Result<JoinHandle<ConnectionState>>
    where
        H: Handler + Send + Sync + 'static,
    {
        let (stream, peer) = self.inner.accept().map_err(Error::Accept)?;
        debug!(%peer, "accepted connection");

        let handler = Arc::clone(handler);
        let read_timeout = self.read_timeout;
        let reject_malformed = self.reject_malformed;

        thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                let span = info_span!("connection", %peer);
                let _enter = span.enter();

                Connection::new(FdSessionOps::new(stream), read_timeout)
                    .with_peer(peer)
                    .reject_malformed(reject_malformed)
                    .run(&*handler)
            })
            .map_err(Error::Spawn)
    }

    /// Accept connections forever
    ///
    /// Accept failures are logged and the loop keeps going.
    pub fn serve<H>(&self, handler: H)
    where
        H: Handler + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        loop {
            if let Err(e) = self.accept(&handler) {
                error!(error = %e, "accept failed");
            }
        }
    }
}
