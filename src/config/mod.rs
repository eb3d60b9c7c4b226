//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! TARGET env / positional argument / built-in default
//!     → target.rs (parse & validate upstream URL)
//! PORT env / default
//!     → loader.rs (listener address)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to the relay
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup and never changes
//! - Any resolution error is fatal before a socket is opened
//! - Resolution takes an explicit env lookup so precedence is testable

pub mod loader;
pub mod schema;
pub mod target;

pub use loader::ConfigError;
pub use schema::ListenerConfig;
pub use schema::ProxyConfig;
pub use target::{Target, TargetScheme};
