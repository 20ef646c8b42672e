//! Per-connection failure taxonomy.

use std::io;

use thiserror::Error;

/// Why a client connection ended without completing its request.
///
/// None of these are surfaced to the client except [`ProxyError::AuthRejected`],
/// which is answered with a 407 before the connection is closed.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Unparseable request line, invalid URL or port.
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    /// Missing or incorrect `Proxy-Authorization` credential.
    #[error("proxy authentication failed")]
    AuthRejected,

    /// The origin could not be reached.
    #[error("failed to connect to origin {target}")]
    OriginConnect {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Read or write failure on an established connection.
    #[error("io error")]
    Io(#[from] io::Error),
}

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;
