//! The relay: one fixed upstream, two forwarding modes.
//!
//! # Data Flow
//! ```text
//! Request<Incoming>
//!     → is_upgrade_request?
//!         no  → forward(): rewrite URI + Host → upstream client → relay_response / 502
//!         yes → upgrade::forward_upgrade(): replay handshake → 101 → splice
//!
//! Upgrades that open a connection never reach here; the server hands them
//! to upgrade::relay_raw_upgrade() before hyper sees the socket.
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::Target;
use crate::http::error::{display_chain, RelayError};
use crate::http::request::{inbound_path, into_outbound, is_upgrade_request, HostHeader};
use crate::http::response::{bad_gateway, relay_response};
use crate::http::upgrade;
use crate::net::UpstreamConnector;

/// HTTP client that always dials the Target.
pub type UpstreamClient = Client<UpstreamConnector, Body>;

/// Forwards every request to the configured Target.
pub struct Relay {
    target: Arc<Target>,
    connector: UpstreamConnector,
    client: UpstreamClient,
}

impl Relay {
    pub fn new(target: Target) -> Result<Self, RelayError> {
        let target = Arc::new(target);
        let connector = UpstreamConnector::new(Arc::clone(&target))?;
        let client = Client::builder(TokioExecutor::new()).build(connector.clone());

        Ok(Self {
            target,
            connector,
            client,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub(crate) fn connector(&self) -> &UpstreamConnector {
        &self.connector
    }

    pub(crate) fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Relay one inbound request.
    ///
    /// An `Err` means the client connection must be dropped without a response.
    pub async fn handle(&self, request: Request<Incoming>) -> Result<Response<Body>, RelayError> {
        if is_upgrade_request(request.headers()) {
            return upgrade::forward_upgrade(self, request).await;
        }
        Ok(self.forward(request).await)
    }

    /// Plain HTTP forwarding. Never fails: transport errors become a 502.
    async fn forward(&self, request: Request<Incoming>) -> Response<Body> {
        let method = request.method().clone();
        let path = inbound_path(request.uri()).to_string();

        tracing::debug!(method = %method, path = %path, "Proxying request");

        let outbound = match into_outbound(&self.target, request.map(Body::new), HostHeader::Rewrite) {
            Ok(outbound) => outbound,
            Err(e) => {
                tracing::error!(method = %method, path = %path, error = %e, "Proxy request error");
                return bad_gateway();
            }
        };

        match self.client.request(outbound).await {
            Ok(response) => {
                tracing::debug!(method = %method, path = %path, status = %response.status(), "Upstream responded");
                relay_response(response)
            }
            Err(e) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    error = %display_chain(&e),
                    "Proxy request error"
                );
                bad_gateway()
            }
        }
    }
}
