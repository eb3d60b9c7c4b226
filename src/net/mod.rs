//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (id + live count)
//!     → rewind.rs (replay bytes read while sniffing)
//!     → Hand off to HTTP layer
//!
//! Outbound:
//!     HTTP layer
//!     → upstream.rs (dial Target)
//!     → tls.rs (TLS for https targets)
//! ```

pub mod connection;
pub mod listener;
pub mod rewind;
pub mod tls;
pub mod upstream;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
pub use rewind::Rewind;
pub use upstream::{UpstreamConnector, UpstreamStream};
