//! The upstream origin.
//!
//! A [`Target`] is parsed once at startup and never changes. It carries
//! everything the relay needs to reach the upstream: scheme, dial host, port,
//! the `Host` authority to present, and the base path requests are mounted
//! under.

use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

use crate::config::loader::ConfigError;

/// Transport used to reach the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScheme {
    Http,
    Https,
}

impl TargetScheme {
    /// Port implied when the URL does not name one.
    pub fn default_port(self) -> u16 {
        match self {
            TargetScheme::Http => 80,
            TargetScheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetScheme::Http => "http",
            TargetScheme::Https => "https",
        }
    }
}

/// Validated upstream origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
    scheme: TargetScheme,
    /// Host to dial and to present as TLS server name (IPv6 without brackets).
    host: String,
    port: u16,
    /// Value written to the outbound `Host` header.
    authority: String,
}

impl Target {
    /// Parse and validate an absolute http(s) URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|source| ConfigError::InvalidTarget {
            url: raw.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => TargetScheme::Http,
            "https" => TargetScheme::Https,
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    url: raw.to_string(),
                    scheme: other.to_string(),
                })
            }
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ConfigError::MissingHost { url: raw.to_string() }),
        };

        // `host_str` keeps IPv6 brackets; `port` is None for the scheme default.
        let host_str = url.host_str().unwrap_or(&host);
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host_str, port),
            None => host_str.to_string(),
        };
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self {
            url,
            scheme,
            host,
            port,
            authority,
        })
    }

    pub fn scheme(&self) -> TargetScheme {
        self.scheme
    }

    /// Whether connections to the upstream are wrapped in TLS.
    pub fn is_tls(&self) -> bool {
        self.scheme == TargetScheme::Https
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host[:port]`, with the port omitted when it is the scheme default.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path component of the configured URL (`/` when none was given).
    pub fn base_path(&self) -> &str {
        self.url.path()
    }

    /// Normalized URL as configured.
    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Mount an inbound path-and-query under the base path.
    ///
    /// A base path of `/` contributes nothing; any other base path is
    /// prepended verbatim.
    pub fn outbound_path(&self, inbound: &str) -> String {
        match self.base_path() {
            "/" => inbound.to_string(),
            base => format!("{}{}", base, inbound),
        }
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.href())
    }
}
