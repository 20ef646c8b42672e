//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Proxy credential and challenge realm.
    pub auth: AuthConfig,

    /// Request log sink.
    pub access_log: AccessLogConfig,

    /// Per-connection behavior.
    pub proxy: ProxySettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Credential every client must present in `Proxy-Authorization`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,

    pub password: String,

    /// Realm advertised in the `Proxy-Authenticate` challenge.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
            realm: "My Proxy".to_string(),
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Write request records at all.
    pub enabled: bool,

    /// File the records are appended to.
    pub path: String,

    /// Mirror each record to stdout.
    pub console: bool,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "proxy_log.txt".to_string(),
            console: true,
        }
    }
}

/// Per-connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Capacity of the initial header read and of each relay chunk.
    pub buffer_size: usize,

    /// Origin connect timeout in seconds. Unset means wait indefinitely.
    pub connect_timeout_secs: Option<u64>,

    /// How long shutdown waits for in-flight connections, in seconds.
    pub drain_timeout_secs: u64,
}

impl ProxySettings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            connect_timeout_secs: None,
            drain_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address for the Prometheus scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.auth.username, "admin");
        assert_eq!(config.auth.password, "password");
        assert_eq!(config.auth.realm, "My Proxy");
        assert_eq!(config.access_log.path, "proxy_log.txt");
        assert_eq!(config.proxy.buffer_size, 8192);
        assert!(config.proxy.connect_timeout().is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [auth]
            username = "alice"

            [proxy]
            connect_timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.username, "alice");
        assert_eq!(config.auth.password, "password");
        assert_eq!(config.proxy.connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.listener.max_connections, 10_000);
    }
}
