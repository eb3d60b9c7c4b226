//! Error types for the relay.

use axum::http::header::{HeaderName, InvalidHeaderValue};
use thiserror::Error;
use tokio_rustls::rustls;

/// Failure while relaying one request or upgrade.
///
/// Errors returned from the service close the client connection without a
/// response, so only failures where no response is possible end up here; a
/// plain HTTP transport failure is answered with 502 instead.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to build upstream TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to build outbound request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("invalid Host header value: {0}")]
    Host(#[from] InvalidHeaderValue),

    #[error("upstream upgrade failed: {0}")]
    Upgrade(#[source] hyper_util::client::legacy::Error),
}

/// Reason a single response header was not copied to the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderCopyError {
    #[error("invalid header name {0:?}")]
    Name(String),

    #[error("invalid value for header {0}")]
    Value(HeaderName),
}

/// Render an error with its whole `source()` chain, `outer: inner: root`.
pub fn display_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
