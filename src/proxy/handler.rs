//! Per-connection request handling.
//!
//! # State Machine
//! ```text
//! AwaitRequest ──(0 bytes)──────────────────────────────────────▶ Closed
//!      │
//!      ▼
//! Authenticating ──(bad/missing credential, send 407)───────────▶ Closed
//!      │
//!      ▼
//! Parsing ──(malformed line / target, no response)──────────────▶ Closed
//!      │
//!      ├── CONNECT ──▶ HttpsTunnel (200 banner, two relays) ─────▶ Closed
//!      └── absolute URL ──▶ HttpForward (raw header, one relay) ─▶ Closed
//! ```
//!
//! The client stream is owned by [`ConnectionHandler::handle`] and the origin
//! stream by the flow that opened it, so both are closed on every return path.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::net::origin::{OriginConnector, OriginTarget};
use crate::net::relay::{relay, tunnel};
use crate::observability::{metrics, AccessLog};
use crate::proxy::auth::{AuthGate, Credential};
use crate::proxy::request::{ProxyRequest, RequestKind};
use crate::proxy::response::{proxy_auth_required, CONNECTION_ESTABLISHED};

/// How a connection that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The client closed before sending anything.
    Empty,
    /// A CONNECT tunnel ran to completion.
    Tunneled { upstream: u64, downstream: u64 },
    /// A plain HTTP request was forwarded and its response relayed.
    Forwarded { request: u64, response: u64 },
}

/// Serves one accepted client connection at a time; shared across tasks.
#[derive(Debug)]
pub struct ConnectionHandler {
    gate: AuthGate,
    connector: OriginConnector,
    access_log: Arc<AccessLog>,
    buffer_size: usize,
}

impl ConnectionHandler {
    pub fn new(
        gate: AuthGate,
        connector: OriginConnector,
        access_log: Arc<AccessLog>,
        buffer_size: usize,
    ) -> Self {
        Self {
            gate,
            connector,
            access_log,
            buffer_size,
        }
    }

    /// Builds a handler from the validated configuration.
    pub fn from_config(config: &ProxyConfig, access_log: Arc<AccessLog>) -> Self {
        let credential = Credential::from(&config.auth);
        Self::new(
            AuthGate::new(&credential, config.auth.realm.clone()),
            OriginConnector::new(config.proxy.connect_timeout()),
            access_log,
            config.proxy.buffer_size,
        )
    }

    /// Runs the full request lifecycle for `client`.
    ///
    /// The request header is taken from a single read of at most the buffer
    /// size; a header that arrives in several segments is not reassembled.
    /// Apart from the 407 challenge, every error is presented to the client
    /// as the connection closing.
    pub async fn handle(&self, mut client: TcpStream) -> Result<Outcome> {
        let mut buf = vec![0u8; self.buffer_size];
        let n = client.read(&mut buf).await?;
        if n == 0 {
            return Ok(Outcome::Empty);
        }
        let raw = &buf[..n];
        let header = String::from_utf8_lossy(raw);

        if !self.gate.check(&header) {
            metrics::record_auth_failure();
            client
                .write_all(proxy_auth_required(self.gate.realm()).as_bytes())
                .await?;
            let _ = client.shutdown().await;
            return Err(ProxyError::AuthRejected);
        }

        let request = ProxyRequest::parse(&header)?;
        tracing::debug!(method = %request.method, request_target = %request.target, "Request parsed");
        self.access_log.record(&request.log_url()).await;

        match request.kind {
            RequestKind::Connect => {
                metrics::record_request("connect");
                self.serve_tunnel(client, &request.target).await
            }
            RequestKind::Forward => {
                metrics::record_request("http");
                self.serve_forward(client, &request.target, raw).await
            }
        }
    }

    async fn open_origin(&self, target: &OriginTarget) -> Result<TcpStream> {
        self.connector.connect(target).await.inspect_err(|_| {
            metrics::record_origin_failure();
        })
    }

    async fn serve_tunnel(&self, mut client: TcpStream, target: &str) -> Result<Outcome> {
        let target = OriginTarget::from_connect_target(target)?;
        let mut origin = self.open_origin(&target).await?;

        client.write_all(CONNECTION_ESTABLISHED).await?;

        let stats = tunnel(&mut client, &mut origin, self.buffer_size).await;
        let (upstream, downstream) = stats.bytes();
        metrics::record_relay_bytes("upstream", upstream);
        metrics::record_relay_bytes("downstream", downstream);

        for (direction, result) in [
            ("upstream", &stats.client_to_origin),
            ("downstream", &stats.origin_to_client),
        ] {
            if let Err(e) = result {
                tracing::debug!(direction, error = %e, "Tunnel relay ended with error");
            }
        }

        tracing::debug!(origin = %target, upstream, downstream, "Tunnel closed");
        Ok(Outcome::Tunneled {
            upstream,
            downstream,
        })
    }

    async fn serve_forward(&self, mut client: TcpStream, url: &str, raw: &[u8]) -> Result<Outcome> {
        let target = OriginTarget::from_absolute_url(url)?;
        let mut origin = self.open_origin(&target).await?;

        origin.write_all(raw).await?;
        let response = relay(&mut origin, &mut client, self.buffer_size).await?;
        metrics::record_relay_bytes("upstream", raw.len() as u64);
        metrics::record_relay_bytes("downstream", response);

        tracing::debug!(origin = %target, response_bytes = response, "Forwarded request completed");
        Ok(Outcome::Forwarded {
            request: raw.len() as u64,
            response,
        })
    }
}
