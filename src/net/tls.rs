//! TLS client configuration for https upstreams.

use std::sync::Arc;

use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

/// Build a connector trusting the Mozilla root set.
///
/// No ALPN is offered, so the upstream always speaks HTTP/1.1 and upgrade
/// handshakes keep working.
pub fn client_connector() -> Result<TlsConnector, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_roots() {
        assert!(client_connector().is_ok());
    }
}
