//! Configuration resolution from the process environment.
//!
//! Precedence for the upstream URL is `TARGET` env, then the positional
//! command-line argument, then [`DEFAULT_TARGET`]. The listening port comes
//! from `PORT`, else [`DEFAULT_PORT`].

use std::num::ParseIntError;

use thiserror::Error;

use crate::config::schema::{
    ListenerConfig, ProxyConfig, DEFAULT_PORT, DEFAULT_TARGET, PORT_ENV, TARGET_ENV,
};
use crate::config::target::Target;

/// Error type for configuration resolution. Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid TARGET URL: {url} ({source})")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid TARGET URL: {url} (unsupported scheme `{scheme}`)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("Invalid TARGET URL: {url} (no host)")]
    MissingHost { url: String },

    #[error("Invalid PORT: {value} ({source})")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl ProxyConfig {
    /// Resolve configuration from the real process environment.
    pub fn from_env(cli_target: Option<String>) -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok(), cli_target)
    }

    /// Resolve configuration from an arbitrary variable lookup.
    pub fn resolve<F>(env: F, cli_target: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_target = env(TARGET_ENV)
            .filter(|v| !v.is_empty())
            .or(cli_target)
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        let target = Target::parse(&raw_target)?;

        let port = match env(PORT_ENV).filter(|v| !v.is_empty()) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            listener: ListenerConfig::with_port(port),
            target,
        })
    }
}
