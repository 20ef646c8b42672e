//! Basic proxy authentication.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::config::AuthConfig;

const AUTH_PREFIX: &str = "Proxy-Authorization: Basic ";

/// The single username/password pair the proxy accepts.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `username:password` form carried inside a Basic token.
    fn joined(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }

    /// Encodes the credential as a `Proxy-Authorization` header value.
    pub fn basic_header_value(&self) -> String {
        format!("Basic {}", STANDARD.encode(self.joined()))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&AuthConfig> for Credential {
    fn from(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

/// Validates the `Proxy-Authorization` line of a raw request header.
#[derive(Debug, Clone)]
pub struct AuthGate {
    expected: Vec<u8>,
    realm: String,
}

impl AuthGate {
    pub fn new(credential: &Credential, realm: impl Into<String>) -> Self {
        Self {
            expected: credential.joined().into_bytes(),
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Returns true when the first `Proxy-Authorization: Basic` line decodes
    /// to exactly the configured `username:password`.
    ///
    /// Only the first matching line is consulted. A token that is not valid
    /// base64 fails authentication. The comparison is a plain byte equality
    /// and is not constant-time.
    pub fn check(&self, header: &str) -> bool {
        let Some(token) = header
            .split("\r\n")
            .find_map(|line| line.strip_prefix(AUTH_PREFIX))
        else {
            return false;
        };

        match STANDARD.decode(token.trim()) {
            Ok(decoded) => decoded == self.expected,
            Err(e) => {
                tracing::debug!(error = %e, "Proxy-Authorization token is not valid base64");
                false
            }
        }
    }
}
