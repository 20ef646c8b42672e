//! Accept loop.
//!
//! # Responsibilities
//! - Accept client connections from the bounded listener
//! - Spawn one task per connection running the shared handler
//! - Stop accepting on shutdown and drain in-flight connections
//!
//! # Design Decisions
//! - A failing or panicking connection task never reaches the accept loop
//! - Accept errors are logged and the loop keeps going
//! - Connections still running after the drain window are left to the runtime

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::{metrics, AccessLog};
use crate::proxy::handler::{ConnectionHandler, Outcome};

/// Back-off after a failed accept, so a persistent error (e.g. EMFILE)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// The forward proxy server.
pub struct ProxyServer {
    handler: Arc<ConnectionHandler>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl ProxyServer {
    pub fn new(handler: ConnectionHandler, drain_timeout: Duration) -> Self {
        Self {
            handler: Arc::new(handler),
            tracker: ConnectionTracker::new(),
            drain_timeout,
        }
    }

    /// Create a server from the validated configuration.
    pub fn from_config(config: &ProxyConfig, access_log: Arc<AccessLog>) -> Self {
        Self::new(
            ConnectionHandler::from_config(config, access_log),
            config.proxy.drain_timeout(),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "Forward proxy accepting connections");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        metrics::record_connection();
                        let guard = self.tracker.track();
                        let handler = Arc::clone(&self.handler);
                        let span = tracing::info_span!(
                            "connection",
                            connection_id = %guard.id(),
                            peer_addr = %peer_addr,
                        );
                        tokio::spawn(
                            async move {
                                serve_connection(&handler, stream, peer_addr).await;
                                drop(guard);
                                drop(permit);
                            }
                            .instrument(span),
                        );
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        let in_flight = self.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, "Draining connections");
            if !self.tracker.wait_idle(self.drain_timeout).await {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain timeout elapsed with connections still open"
                );
            }
        }

        tracing::info!("Forward proxy stopped");
        Ok(())
    }
}

async fn serve_connection(handler: &ConnectionHandler, stream: TcpStream, peer_addr: SocketAddr) {
    match handler.handle(stream).await {
        Ok(Outcome::Empty) => tracing::trace!("Client closed before sending a request"),
        Ok(outcome) => tracing::debug!(?outcome, "Request completed"),
        Err(ProxyError::AuthRejected) => {
            tracing::info!(%peer_addr, "Rejected request without valid proxy credentials")
        }
        Err(e @ ProxyError::OriginConnect { .. }) => {
            tracing::warn!(error = %e, source = ?std::error::Error::source(&e), "Origin unreachable")
        }
        Err(e) => tracing::debug!(error = %e, "Connection dropped"),
    }
}
