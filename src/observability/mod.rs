//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connection handlers produce:
//!     → logging.rs (structured diagnostic events via tracing)
//!     → access_log.rs (one record per authenticated request)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (diagnostics, mirrored access records)
//!     → access log file
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The access log is an owned object passed to handlers, never a global
//! - Access records are serialized through one lock
//! - Metrics are cheap (atomic increments) and off by default

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::AccessLog;
