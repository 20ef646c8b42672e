//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer size, timeouts, connection limit)
//! - Reject credentials that cannot round-trip through Basic auth
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

const MIN_BUFFER_SIZE: usize = 512;
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("auth.username must not be empty")]
    EmptyUsername,

    #[error("auth.username must not contain ':'")]
    UsernameColon,

    #[error("auth.realm must not contain '\"'")]
    RealmQuote,

    #[error("proxy.buffer_size {0} is outside 512..=1048576")]
    BufferSize(usize),

    #[error("proxy.connect_timeout_secs must be greater than zero when set")]
    ZeroConnectTimeout,

    #[error("access_log.path must not be empty when the access log is enabled")]
    EmptyLogPath,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.auth.username.is_empty() {
        errors.push(ValidationError::EmptyUsername);
    } else if config.auth.username.contains(':') {
        errors.push(ValidationError::UsernameColon);
    }
    if config.auth.realm.contains('"') {
        errors.push(ValidationError::RealmQuote);
    }

    let buffer_size = config.proxy.buffer_size;
    if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&buffer_size) {
        errors.push(ValidationError::BufferSize(buffer_size));
    }
    if config.proxy.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    if config.access_log.enabled && config.access_log.path.trim().is_empty() {
        errors.push(ValidationError::EmptyLogPath);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
