//! Upgrade (WebSocket) forwarding.
//!
//! # Responsibilities
//! - Replay the client's handshake to the Target on a fresh connection
//! - Write the bytes that trailed the handshake right behind it
//! - Splice both byte streams until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - The handshake is replayed with every original header, `Host` included
//! - No frame inspection: bytes are copied as they arrive, in order
//! - On a connection's first request the upstream's answer reaches the client
//!   untouched, whatever its status
//! - An upgrade sent on a reused keep-alive connection is already inside
//!   hyper; it goes through the pooled client and the `101` is mirrored
//! - An upstream that cannot be reached closes the client connection without
//!   a response

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::Instrument;

use crate::http::error::{display_chain, RelayError};
use crate::http::handshake::ClientHandshake;
use crate::http::proxy::Relay;
use crate::http::request::{inbound_path, into_outbound, HostHeader};
use crate::http::response::{relay_response, switching_protocols};

/// Lifecycle of one upgraded connection pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    /// Handshake sent upstream, waiting for the answer.
    Connecting,
    /// Both sides upgraded, bytes flowing.
    Relaying,
    /// Terminal. Reached from any state.
    Closed,
}

/// Inputs that drive [`UpgradeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeEvent {
    ConnectSucceeded,
    ConnectFailed,
    End,
    Error,
}

impl UpgradeState {
    pub fn next(self, event: UpgradeEvent) -> Self {
        match (self, event) {
            (UpgradeState::Closed, _) => UpgradeState::Closed,
            (UpgradeState::Connecting | UpgradeState::Relaying, UpgradeEvent::ConnectSucceeded) => {
                UpgradeState::Relaying
            }
            (_, UpgradeEvent::ConnectFailed | UpgradeEvent::End | UpgradeEvent::Error) => {
                UpgradeState::Closed
            }
        }
    }
}

/// One client/upstream pair going through an upgrade.
#[derive(Debug)]
pub struct UpgradeTunnel {
    state: UpgradeState,
    protocol: String,
}

impl UpgradeTunnel {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            state: UpgradeState::Connecting,
            protocol: protocol.into(),
        }
    }

    pub fn state(&self) -> UpgradeState {
        self.state
    }

    /// Feed an event; returns the resulting state.
    pub fn apply(&mut self, event: UpgradeEvent) -> UpgradeState {
        let previous = self.state;
        self.state = previous.next(event);

        if previous != self.state {
            tracing::debug!(
                protocol = %self.protocol,
                from = ?previous,
                to = ?self.state,
                event = ?event,
                "Upgrade state changed"
            );
        }
        self.state
    }

    /// Wait for hyper to hand over both upgraded streams, then splice them.
    async fn splice_upgraded(mut self, client: OnUpgrade, upstream: OnUpgrade) {
        match tokio::try_join!(client, upstream) {
            Ok((client, upstream)) => {
                self.splice(TokioIo::new(client), TokioIo::new(upstream))
                    .await
            }
            Err(e) => {
                self.apply(UpgradeEvent::Error);
                tracing::error!(error = %e, "WebSocket proxy error");
            }
        }
    }

    /// Copy bytes both ways until either side closes or errors.
    async fn splice<C, U>(mut self, mut client: C, mut upstream: U)
    where
        C: AsyncRead + AsyncWrite + Unpin,
        U: AsyncRead + AsyncWrite + Unpin,
    {
        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((to_upstream, to_client)) => {
                self.apply(UpgradeEvent::End);
                tracing::debug!(
                    bytes_to_upstream = to_upstream,
                    bytes_to_client = to_client,
                    "Upgraded connection closed"
                );
            }
            Err(e) => {
                self.apply(UpgradeEvent::Error);
                tracing::error!(error = %e, "WebSocket proxy error");
            }
        }

        let _ = client.shutdown().await;
        let _ = upstream.shutdown().await;
    }
}

/// Relay an upgrade handshake read straight off the client socket.
///
/// Dials the Target, writes the rebuilt handshake followed by `head` (bytes
/// the client sent past its header block), then splices. Returning drops
/// `client`, which closes it.
pub async fn relay_raw_upgrade<S>(relay: &Relay, client: S, handshake: ClientHandshake, head: Vec<u8>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let path = handshake.path().to_string();
    let mut tunnel = UpgradeTunnel::new(handshake.protocol());

    tracing::debug!(
        path = %path,
        protocol = %tunnel.protocol,
        head_len = head.len(),
        "Proxying upgrade"
    );

    let mut upstream = match relay.connector().connect().await {
        Ok(stream) => TokioIo::new(stream),
        Err(e) => {
            tunnel.apply(UpgradeEvent::ConnectFailed);
            tracing::error!(path = %path, error = %e, "WebSocket proxy error");
            return;
        }
    };
    tunnel.apply(UpgradeEvent::ConnectSucceeded);

    let mut preamble = handshake.encode(relay.target());
    preamble.extend_from_slice(&head);

    let written = async {
        upstream.write_all(&preamble).await?;
        upstream.flush().await
    };
    if let Err(e) = written.await {
        tunnel.apply(UpgradeEvent::Error);
        tracing::error!(path = %path, error = %e, "WebSocket proxy error");
        return;
    }

    tunnel.splice(client, upstream).await;
}

/// Forward an upgrade request that hyper already parsed and, on `101`, start
/// splicing in the background.
pub async fn forward_upgrade(
    relay: &Relay,
    mut request: Request<Incoming>,
) -> Result<Response<Body>, RelayError> {
    let protocol = request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let path = inbound_path(request.uri()).to_string();
    let mut tunnel = UpgradeTunnel::new(protocol);

    tracing::debug!(path = %path, protocol = %tunnel.protocol, "Proxying upgrade");

    let client_upgrade = hyper::upgrade::on(&mut request);
    let outbound = match into_outbound(relay.target(), request.map(Body::new), HostHeader::Preserve) {
        Ok(outbound) => outbound,
        Err(e) => {
            tunnel.apply(UpgradeEvent::ConnectFailed);
            tracing::error!(path = %path, error = %e, "WebSocket proxy error");
            return Err(e);
        }
    };

    let mut response = match relay.client().request(outbound).await {
        Ok(response) => response,
        Err(e) => {
            tunnel.apply(UpgradeEvent::ConnectFailed);
            tracing::error!(path = %path, error = %display_chain(&e), "WebSocket proxy error");
            return Err(RelayError::Upgrade(e));
        }
    };

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        tunnel.apply(UpgradeEvent::End);
        tracing::debug!(path = %path, status = %response.status(), "Upstream declined upgrade");
        return Ok(relay_response(response));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut response);
    tunnel.apply(UpgradeEvent::ConnectSucceeded);

    let client_response = switching_protocols(response.headers());
    tokio::spawn(
        tunnel
            .splice_upgraded(client_upgrade, upstream_upgrade)
            .in_current_span(),
    );

    Ok(client_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_then_end() {
        let mut tunnel = UpgradeTunnel::new("websocket");
        assert_eq!(tunnel.state(), UpgradeState::Connecting);
        assert_eq!(tunnel.apply(UpgradeEvent::ConnectSucceeded), UpgradeState::Relaying);
        assert_eq!(tunnel.apply(UpgradeEvent::End), UpgradeState::Closed);
    }

    #[test]
    fn connect_failure_closes() {
        assert_eq!(
            UpgradeState::Connecting.next(UpgradeEvent::ConnectFailed),
            UpgradeState::Closed
        );
    }

    #[test]
    fn closed_reachable_from_every_state() {
        for state in [UpgradeState::Connecting, UpgradeState::Relaying, UpgradeState::Closed] {
            for event in [UpgradeEvent::ConnectFailed, UpgradeEvent::End, UpgradeEvent::Error] {
                assert_eq!(state.next(event), UpgradeState::Closed);
            }
        }
    }

    #[test]
    fn closing_twice_is_a_no_op() {
        let mut tunnel = UpgradeTunnel::new("websocket");
        tunnel.apply(UpgradeEvent::ConnectSucceeded);
        tunnel.apply(UpgradeEvent::Error);
        assert_eq!(tunnel.apply(UpgradeEvent::End), UpgradeState::Closed);
        assert_eq!(tunnel.apply(UpgradeEvent::ConnectSucceeded), UpgradeState::Closed);
    }
}
