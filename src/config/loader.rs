//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `auth.username`.
pub const USERNAME_ENV: &str = "PROXY_USERNAME";
/// Environment variable overriding `auth.password`.
pub const PASSWORD_ENV: &str = "PROXY_PASSWORD";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Build the startup configuration and validate the result.
///
/// Layers, lowest precedence first: built-in defaults, the TOML file at
/// `path` (if any), the credential variables found through `lookup`, then
/// `overrides` (command-line flags).
pub fn load_config<F, O>(path: Option<&Path>, lookup: F, overrides: O) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    O: FnOnce(&mut ProxyConfig),
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config, lookup);
    overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Override the credential from `PROXY_USERNAME` / `PROXY_PASSWORD`.
///
/// `lookup` abstracts `std::env::var` so callers (and tests) control the source.
/// Unset variables leave the configured value in place.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(username) = lookup(USERNAME_ENV) {
        tracing::debug!(var = USERNAME_ENV, "Proxy username taken from environment");
        config.auth.username = username;
    }
    if let Some(password) = lookup(PASSWORD_ENV) {
        tracing::debug!(var = PASSWORD_ENV, "Proxy password taken from environment");
        config.auth.password = password;
    }
}

/// Read the credential overrides from the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
