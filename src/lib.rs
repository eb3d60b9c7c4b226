//! HTTP/WebSocket relay to a single fixed upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{ProxyConfig, Target};
pub use http::{HttpServer, Relay};
pub use lifecycle::Shutdown;
