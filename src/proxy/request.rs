//! Request line parsing.
//!
//! Only the first line of the header blob is interpreted. Every other line
//! is left for the origin (HTTP forward) or ignored (CONNECT).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ProxyError, Result};

static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[^\s/$.?#].[^\s]*$").expect("static URL pattern is valid")
});

/// Returns true for an absolute `http://` or `https://` URL with a
/// non-empty host and no embedded whitespace.
pub fn is_valid_http_url(target: &str) -> bool {
    HTTP_URL.is_match(target)
}

/// How the proxy will serve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `CONNECT host[:port]`: open an opaque tunnel.
    Connect,
    /// Absolute-form request: forward the raw header to the origin.
    Forward,
}

/// The parts of the request line the proxy acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    pub target: String,
    pub kind: RequestKind,
}

impl ProxyRequest {
    /// Parses the request line of a raw header blob.
    ///
    /// Fails when there is no non-empty line, when the first line has fewer
    /// than two space-separated fields, or when a non-CONNECT target is not
    /// an absolute HTTP(S) URL.
    pub fn parse(header: &str) -> Result<Self> {
        let request_line = header
            .split("\r\n")
            .find(|line| !line.is_empty())
            .ok_or(ProxyError::Malformed("empty request"))?;

        let mut fields = request_line.split(' ');
        let (Some(method), Some(target)) = (fields.next(), fields.next()) else {
            return Err(ProxyError::Malformed("request line has fewer than two fields"));
        };

        let kind = if method.eq_ignore_ascii_case("CONNECT") {
            RequestKind::Connect
        } else if is_valid_http_url(target) {
            RequestKind::Forward
        } else {
            return Err(ProxyError::Malformed("target is not an absolute http(s) URL"));
        };

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            kind,
        })
    }

    /// The URL written to the access log for this request.
    pub fn log_url(&self) -> String {
        match self.kind {
            RequestKind::Connect => format!("https://{}", self.target),
            RequestKind::Forward => self.target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect() {
        let req = ProxyRequest::parse("CONNECT example.com:443 HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .unwrap();
        assert_eq!(req.kind, RequestKind::Connect);
        assert_eq!(req.target, "example.com:443");
        assert_eq!(req.log_url(), "https://example.com:443");
    }

    #[test]
    fn connect_method_is_case_insensitive() {
        let req = ProxyRequest::parse("connect example.com HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.kind, RequestKind::Connect);
        assert_eq!(req.method, "connect");
    }

    #[test]
    fn parses_absolute_get() {
        let req = ProxyRequest::parse("GET http://example.com/path?q=1 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.kind, RequestKind::Forward);
        assert_eq!(req.log_url(), "http://example.com/path?q=1");
    }

    #[test]
    fn skips_leading_blank_lines() {
        let req = ProxyRequest::parse("\r\n\r\nGET http://example.com/ HTTP/1.1\r\n").unwrap();
        assert_eq!(req.target, "http://example.com/");
    }

    #[test]
    fn rejects_empty_header() {
        assert!(matches!(ProxyRequest::parse(""), Err(ProxyError::Malformed(_))));
        assert!(matches!(ProxyRequest::parse("\r\n\r\n"), Err(ProxyError::Malformed(_))));
    }

    #[test]
    fn rejects_single_field() {
        assert!(ProxyRequest::parse("GET\r\n\r\n").is_err());
    }

    #[test]
    fn rejects_origin_form_target() {
        assert!(ProxyRequest::parse("GET /index.html HTTP/1.1\r\n\r\n").is_err());
    }

    #[test]
    fn double_space_yields_empty_target() {
        assert!(ProxyRequest::parse("GET  http://example.com/ HTTP/1.1\r\n").is_err());
    }

    #[test]
    fn url_pattern() {
        assert!(is_valid_http_url("http://example.com"));
        assert!(is_valid_http_url("HTTPS://Example.com:8443/a/b"));
        assert!(is_valid_http_url("http://127.0.0.1:8080/"));

        assert!(!is_valid_http_url("ftp://example.com/"));
        assert!(!is_valid_http_url("http://"));
        assert!(!is_valid_http_url("http:///path"));
        assert!(!is_valid_http_url("http://.example.com"));
        assert!(!is_valid_http_url("http://exa mple.com"));
        assert!(!is_valid_http_url("example.com"));
    }
}
