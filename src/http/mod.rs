//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → handshake.rs (first request head: upgrade or not)
//!         upgrade → upgrade.rs (raw handshake replay, splice)
//!     → server.rs (hyper HTTP/1, trace layer)
//!     → proxy.rs (classify: plain request or upgrade)
//!     → request.rs (rewrite URI and Host)
//!     → upstream (net::upstream)
//!     → response.rs (status, headers, streamed body) or upgrade.rs (splice)
//!     → Send to client
//! ```

pub mod error;
pub mod handshake;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;

pub use error::{HeaderCopyError, RelayError};
pub use proxy::Relay;
pub use server::HttpServer;
