//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (identity, lifecycle tracking)
//!     → Hand off to proxy::handler
//!
//! Outbound:
//!     proxy::handler → origin.rs (resolve + connect) → relay.rs (byte copy)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Relays never inspect or transform the bytes they move

pub mod connection;
pub mod listener;
pub mod origin;
pub mod relay;
