//! Client-facing responses.
//!
//! # Responsibilities
//! - Copy upstream status and headers onto the client response
//! - Stream the upstream body back without buffering
//! - Build the 502 answer for unreachable upstreams
//!
//! # Design Decisions
//! - Headers are copied one at a time; a header that cannot be represented
//!   is skipped and the response goes on
//! - Mid-stream body errors are logged here since the status line is
//!   already on the wire

use axum::body::{Body, Bytes, HttpBody};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Response, StatusCode};
use axum::BoxError;
use http_body_util::BodyExt;

use crate::http::error::HeaderCopyError;

/// Body sent with a 502.
pub const BAD_GATEWAY_BODY: &str = "Bad Gateway";

/// Copy a single raw header onto `dst`, appending to existing values.
pub fn copy_header(dst: &mut HeaderMap, name: &[u8], value: &[u8]) -> Result<(), HeaderCopyError> {
    let name = HeaderName::from_bytes(name)
        .map_err(|_| HeaderCopyError::Name(String::from_utf8_lossy(name).into_owned()))?;
    let value = HeaderValue::from_bytes(value).map_err(|_| HeaderCopyError::Value(name.clone()))?;
    dst.append(name, value);
    Ok(())
}

/// Copy every header that can be copied; returns the ones that were skipped.
pub fn copy_headers<'a, I>(src: I, dst: &mut HeaderMap) -> Vec<HeaderCopyError>
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut skipped = Vec::new();
    for (name, value) in src {
        if let Err(e) = copy_header(dst, name, value) {
            tracing::debug!(error = %e, "Skipping response header");
            skipped.push(e);
        }
    }
    skipped
}

fn header_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&[u8], &[u8])> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().as_bytes(), value.as_bytes()))
}

/// Mirror an upstream response: status, headers, streamed body.
pub fn relay_response<B>(upstream: Response<B>) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + std::fmt::Display,
{
    let (parts, body) = upstream.into_parts();

    let body = body.map_err(|e| {
        tracing::error!(error = %e, "Proxy response stream error");
        e
    });

    let mut response = Response::new(Body::new(body));
    *response.status_mut() = parts.status;
    copy_headers(header_pairs(&parts.headers), response.headers_mut());
    response
}

/// Client answer for an upstream `101 Switching Protocols`.
pub fn switching_protocols(upstream_headers: &HeaderMap) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    copy_headers(header_pairs(upstream_headers), response.headers_mut());
    response
}

/// `502 Bad Gateway` with a plain-text body.
pub fn bad_gateway() -> Response<Body> {
    let mut response = Response::new(Body::from(BAD_GATEWAY_BODY));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
