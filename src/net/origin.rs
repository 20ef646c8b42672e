//! Origin resolution and connection.
//!
//! # Responsibilities
//! - Turn a CONNECT authority or an absolute URL into host and port
//! - Open exactly one outbound TCP connection per request
//!
//! # Design Decisions
//! - No retries: a failed connect is terminal for the request
//! - Connect timeout is optional and disabled by default

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use url::{Host, Url};

use crate::error::{ProxyError, Result};

const DEFAULT_CONNECT_PORT: u16 = 443;
const DEFAULT_HTTP_PORT: u16 = 80;

/// Host and port of the server a request is bound for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTarget {
    /// Hostname or IP literal, without brackets.
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for OriginTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl OriginTarget {
    /// Parses a CONNECT target of the form `host[:port]`, defaulting to 443.
    ///
    /// Bracketed IPv6 literals (`[::1]:8443`) are accepted. Everything after
    /// the first `:` is the port, so `host:443:x` is rejected as a
    /// non-numeric port rather than truncated to 443.
    pub fn from_connect_target(target: &str) -> Result<Self> {
        let (host, port) = match target.strip_prefix('[') {
            Some(rest) => {
                let (host, after) = rest
                    .split_once(']')
                    .ok_or(ProxyError::Malformed("unterminated IPv6 literal"))?;
                match after {
                    "" => (host, None),
                    _ => (
                        host,
                        Some(
                            after
                                .strip_prefix(':')
                                .ok_or(ProxyError::Malformed("junk after IPv6 literal"))?,
                        ),
                    ),
                }
            }
            None => match target.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (target, None),
            },
        };

        if host.is_empty() {
            return Err(ProxyError::Malformed("CONNECT target has no host"));
        }
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ProxyError::Malformed("CONNECT port is not a number"))?,
            None => DEFAULT_CONNECT_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Extracts host and port from an absolute URL.
    ///
    /// Uses the explicit port, else the scheme's well-known port, else 80.
    pub fn from_absolute_url(target: &str) -> Result<Self> {
        let url = Url::parse(target).map_err(|_| ProxyError::Malformed("unparseable URL"))?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ProxyError::Malformed("URL has no host")),
        };
        let port = url.port_or_known_default().unwrap_or(DEFAULT_HTTP_PORT);
        Ok(Self { host, port })
    }
}

/// Opens outbound connections to origins.
#[derive(Debug, Clone, Default)]
pub struct OriginConnector {
    connect_timeout: Option<Duration>,
}

impl OriginConnector {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// Makes a single connection attempt to `target`.
    pub async fn connect(&self, target: &OriginTarget) -> Result<TcpStream> {
        let attempt = TcpStream::connect((target.host.as_str(), target.port));
        let result = match self.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "origin connect timed out")),
            },
            None => attempt.await,
        };

        let stream = result.map_err(|source| ProxyError::OriginConnect {
            target: target.to_string(),
            source,
        })?;
        let _ = stream.set_nodelay(true);

        tracing::debug!(origin = %target, "Origin connected");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn target(host: &str, port: u16) -> OriginTarget {
        OriginTarget {
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn connect_target_with_port() {
        assert_eq!(
            OriginTarget::from_connect_target("example.com:8443").unwrap(),
            target("example.com", 8443)
        );
    }

    #[test]
    fn connect_target_defaults_to_443() {
        assert_eq!(
            OriginTarget::from_connect_target("example.com").unwrap(),
            target("example.com", 443)
        );
    }

    #[test]
    fn connect_target_ipv6() {
        assert_eq!(
            OriginTarget::from_connect_target("[::1]:9000").unwrap(),
            target("::1", 9000)
        );
        assert_eq!(OriginTarget::from_connect_target("[::1]").unwrap(), target("::1", 443));
        assert_eq!(target("::1", 9000).to_string(), "[::1]:9000");
    }

    #[test]
    fn connect_target_rejects_bad_port() {
        assert!(OriginTarget::from_connect_target("example.com:https").is_err());
        assert!(OriginTarget::from_connect_target("example.com:70000").is_err());
        assert!(OriginTarget::from_connect_target("example.com:").is_err());
    }

    #[test]
    fn connect_target_with_extra_colon_is_malformed() {
        assert!(matches!(
            OriginTarget::from_connect_target("example.com:443:x"),
            Err(ProxyError::Malformed("CONNECT port is not a number"))
        ));
    }

    #[test]
    fn connect_target_rejects_missing_host() {
        assert!(OriginTarget::from_connect_target("").is_err());
        assert!(OriginTarget::from_connect_target(":443").is_err());
        assert!(OriginTarget::from_connect_target("[::1").is_err());
    }

    #[test]
    fn absolute_url_ports() {
        assert_eq!(
            OriginTarget::from_absolute_url("http://example.com/path").unwrap(),
            target("example.com", 80)
        );
        assert_eq!(
            OriginTarget::from_absolute_url("http://example.com:8080/").unwrap(),
            target("example.com", 8080)
        );
        assert_eq!(
            OriginTarget::from_absolute_url("https://example.com/").unwrap(),
            target("example.com", 443)
        );
        assert_eq!(
            OriginTarget::from_absolute_url("http://[::1]:81/").unwrap(),
            target("::1", 81)
        );
    }

    #[tokio::test]
    async fn connect_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = OriginConnector::default();
        let stream = connector.connect(&target("127.0.0.1", port)).await.unwrap();
        let (_accepted, peer) = listener.accept().await.unwrap();
        assert_eq!(stream.local_addr().unwrap(), peer);
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = OriginConnector::new(Some(Duration::from_secs(5)))
            .connect(&target("127.0.0.1", port))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::OriginConnect { .. }));
    }
}
