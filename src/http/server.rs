//! HTTP server setup.
//!
//! # Responsibilities
//! - Own the accept loop
//! - Route connections that open with an upgrade handshake to the raw relay
//! - Serve every other connection with hyper's HTTP/1 server, upgrades enabled
//! - Wire up middleware (tracing)
//! - Dispatch requests to the relay
//! - Stop accepting on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::{ProxyConfig, Target};
use crate::http::error::RelayError;
use crate::http::handshake::{self, Sniffed};
use crate::http::proxy::Relay;
use crate::http::upgrade;
use crate::lifecycle::ShutdownSignal;
use crate::net::{ConnectionGuard, Listener, ListenerError, Rewind};

/// HTTP server for the relay.
pub struct HttpServer {
    relay: Arc<Relay>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, RelayError> {
        let relay = Arc::new(Relay::new(config.target)?);
        Ok(Self { relay })
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            address = %addr,
            upstream = %self.relay.target(),
            "HTTP server starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_connections = listener.tracker().active_count(),
                        "Shutdown signal received"
                    );
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, guard)) => {
                        serve_connection(Arc::clone(&self.relay), stream, peer, guard);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn target(&self) -> &Target {
        self.relay.target()
    }
}

/// Serve one client connection on its own task.
fn serve_connection(relay: Arc<Relay>, mut stream: TcpStream, peer: SocketAddr, guard: ConnectionGuard) {
    let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);

    tokio::spawn(
        async move {
            let _guard = guard;

            match handshake::sniff(&mut stream).await {
                Ok(Sniffed::Upgrade { handshake, head }) => {
                    upgrade::relay_raw_upgrade(&relay, stream, handshake, head).await;
                }
                Ok(Sniffed::Http(buffered)) => serve_http(relay, Rewind::new(buffered, stream)).await,
                Err(e) => {
                    tracing::debug!(error = %e, "Connection closed before a request arrived");
                }
            }
        }
        .instrument(span),
    );
}

/// Run hyper's HTTP/1 server over the connection.
async fn serve_http(relay: Arc<Relay>, stream: Rewind<TcpStream>) {
    let service = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .service(tower::service_fn(move |request: hyper::Request<Incoming>| {
            let relay = Arc::clone(&relay);
            async move { relay.handle(request).await }
        }));

    let result = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service))
        .with_upgrades()
        .await;

    if let Err(e) = result {
        tracing::debug!(error = %e, "Connection closed with error");
    }
}
