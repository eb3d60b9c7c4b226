//! TCP listener for client connections.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Hand every accepted socket a tracking guard
//!
//! # Design Decisions
//! - No connection limit: fan-out is bounded only by the OS

use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(_, e) | ListenerError::Accept(e) => Some(e),
        }
    }
}

/// Accepting side of the relay.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Live connection bookkeeping.
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind to `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ListenerError::Bind(addr, e))?;

        Ok(Self::from_tcp(listener))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener) -> Self {
        if let Ok(local_addr) = inner.local_addr() {
            tracing::debug!(address = %local_addr, "Listener bound");
        }

        Self {
            inner,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Accept a new connection.
    ///
    /// Returns the stream and a guard that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionGuard), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        let guard = self.tracker.track();

        tracing::debug!(
            peer_addr = %addr,
            connection_id = %guard.id(),
            active_connections = self.tracker.active_count(),
            "Connection accepted"
        );

        Ok((stream, addr, guard))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Live connection bookkeeping.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_tracks_connection_until_guard_dropped() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, guard) = listener.accept().await.unwrap();
        assert_eq!(listener.tracker().active_count(), 1);

        drop(guard);
        assert_eq!(listener.tracker().active_count(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_reports_address() {
        let first = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = first.local_addr().unwrap();

        let err = Listener::bind(addr).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind(a, _) if a == addr));
    }
}
