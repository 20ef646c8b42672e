//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_connections_total` (counter): accepted client connections
//! - `proxy_active_connections` (gauge): current connection count
//! - `proxy_requests_total` (counter): authenticated requests by kind
//! - `proxy_auth_failures_total` (counter): 407 responses sent
//! - `proxy_origin_connect_failures_total` (counter)
//! - `proxy_relay_bytes_total` (counter): bytes relayed by direction
//!
//! Recording is a no-op until a recorder is installed, so the proxy runs
//! the same with metrics disabled.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection() {
    ::metrics::counter!("proxy_connections_total").increment(1);
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("proxy_active_connections").set(count as f64);
}

pub fn record_request(kind: &'static str) {
    ::metrics::counter!("proxy_requests_total", "kind" => kind).increment(1);
}

pub fn record_auth_failure() {
    ::metrics::counter!("proxy_auth_failures_total").increment(1);
}

pub fn record_origin_failure() {
    ::metrics::counter!("proxy_origin_connect_failures_total").increment(1);
}

pub fn record_relay_bytes(direction: &'static str, bytes: u64) {
    ::metrics::counter!("proxy_relay_bytes_total", "direction" => direction).increment(bytes);
}
