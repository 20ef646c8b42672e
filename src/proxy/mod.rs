//! Forward proxy subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept loop, one task per connection)
//!     → handler.rs (read header once)
//!         → auth.rs (Proxy-Authorization check, 407 on failure)
//!         → request.rs (request line → CONNECT | absolute URL)
//!         → net::origin (resolve + connect)
//!         → net::relay (tunnel or response relay)
//! ```
//!
//! # Design Decisions
//! - Authentication happens before the request line is interpreted
//! - The raw header bytes are forwarded untouched on the HTTP path
//! - The credential is fixed for the server's lifetime and never locked

pub mod auth;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use auth::{AuthGate, Credential};
pub use handler::{ConnectionHandler, Outcome};
pub use request::{ProxyRequest, RequestKind};
pub use server::ProxyServer;
