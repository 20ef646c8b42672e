//! Bounded accept side of the proxy.
//!
//! Every accepted client holds a [`ConnectionPermit`] until its task ends,
//! so at most `listener.max_connections` clients are served at once. Further
//! clients wait in the kernel backlog until a permit frees up.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The bind address did not parse or the socket could not be bound.
    #[error("cannot bind proxy listener: {0}")]
    Bind(#[source] io::Error),
    #[error("accepting a client failed: {0}")]
    Accept(#[source] io::Error),
    /// The permit pool was closed; no further clients can be admitted.
    #[error("connection permits closed")]
    Closed,
}

/// Client-facing socket plus the permit pool that caps concurrent clients.
pub struct Listener {
    inner: TcpListener,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind `listener.bind_address` and size the permit pool.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| ListenerError::Bind(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        Self::from_tcp(listener, config.max_connections)
    }

    /// Wrap a socket that is already bound, e.g. an ephemeral test port.
    pub fn from_tcp(listener: TcpListener, max_connections: usize) -> Result<Self, ListenerError> {
        let address = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(%address, max_connections, "Proxy listener bound");

        Ok(Self {
            inner: listener,
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Wait for a free permit, then for the next client.
    ///
    /// The permit is taken before `accept` so a saturated proxy stops pulling
    /// clients off the backlog.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, peer_addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(
            %peer_addr,
            free_permits = self.permits.available_permits(),
            "Client accepted"
        );

        Ok((stream, peer_addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Permits not currently held by a client.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One admitted client. Dropping it, on any exit path of the connection
/// task, frees the slot.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
