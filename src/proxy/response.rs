//! Responses the proxy itself writes to clients.

/// Sent once the CONNECT origin connection is up, before tunneling starts.
pub const CONNECTION_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Builds the 407 challenge for `realm`, with an empty body.
pub fn proxy_auth_required(realm: &str) -> String {
    format!(
        "HTTP/1.1 407 Proxy Authentication Required\r\n\
         Proxy-Authenticate: Basic realm=\"{realm}\"\r\n\
         Content-Length: 0\r\n\r\n"
    )
}
