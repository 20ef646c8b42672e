//! Authenticating HTTP forward proxy.
//!
//! Accepts a client connection, checks its `Proxy-Authorization` Basic
//! credential, then either tunnels raw bytes after a `CONNECT` or forwards a
//! plain absolute-form HTTP request and relays the origin's response.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
