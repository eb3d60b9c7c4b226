//! Configuration schema definitions.

use std::net::{Ipv4Addr, SocketAddr};

use crate::config::target::Target;

/// Environment variable holding the upstream URL.
pub const TARGET_ENV: &str = "TARGET";

/// Environment variable holding the listening port.
pub const PORT_ENV: &str = "PORT";

/// Upstream used when neither the environment nor the command line name one.
pub const DEFAULT_TARGET: &str = "https://truffled.lol";

/// Listening port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Root configuration for the relay.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream origin all traffic is forwarded to.
    pub target: Target,
}

impl ProxyConfig {
    /// Build a config for `target` with the default listener.
    pub fn new(target: Target) -> Self {
        Self {
            listener: ListenerConfig::default(),
            target,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: SocketAddr,
}

impl ListenerConfig {
    /// Listen on every IPv4 interface at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::with_port(DEFAULT_PORT)
    }
}
