//! Request classification and rewriting.
//!
//! # Responsibilities
//! - Decide whether a request asks for a protocol upgrade
//! - Point the request at the Target (URI and path mounting)
//! - Rewrite or keep the `Host` header depending on the forwarding mode

use axum::http::{header, HeaderMap, HeaderValue, Request, Uri};

use crate::config::Target;
use crate::http::error::RelayError;

/// What to do with the inbound `Host` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostHeader {
    /// Replace it with the Target authority (HTTP forwarding).
    Rewrite,
    /// Keep it byte-for-byte (upgrade handshakes are replayed verbatim).
    Preserve,
}

/// True when the request carries `Upgrade` and lists `upgrade` in `Connection`.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    if !headers.contains_key(header::UPGRADE) {
        return false;
    }

    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(lists_upgrade)
}

/// True when a `Connection` value carries the `upgrade` token.
pub fn lists_upgrade(connection: &str) -> bool {
    connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Path and query exactly as the client sent them.
pub fn inbound_path(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}

/// Absolute URI on the Target for an inbound request URI.
pub fn outbound_uri(target: &Target, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    Uri::builder()
        .scheme(target.scheme().as_str())
        .authority(target.authority())
        .path_and_query(target.outbound_path(inbound_path(inbound)))
        .build()
}

/// Turn an inbound request into the request sent upstream.
///
/// Method, version, headers and body carry over unchanged; only the URI and,
/// with [`HostHeader::Rewrite`], the `Host` header differ. Inbound extensions
/// are not forwarded.
pub fn into_outbound<B>(
    target: &Target,
    request: Request<B>,
    host: HostHeader,
) -> Result<Request<B>, RelayError> {
    let (parts, body) = request.into_parts();

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = outbound_uri(target, &parts.uri)?;
    *outbound.version_mut() = parts.version;
    *outbound.headers_mut() = parts.headers;

    if host == HostHeader::Rewrite {
        outbound
            .headers_mut()
            .insert(header::HOST, HeaderValue::from_str(target.authority())?);
    }

    Ok(outbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Version};

    fn target(url: &str) -> Target {
        Target::parse(url).unwrap()
    }

    fn request(uri: &str) -> Request<()> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .version(Version::HTTP_11)
            .header(header::HOST, "proxy.local:8080")
            .header("x-trace", "abc")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(())
            .unwrap()
    }

    #[test]
    fn detects_websocket_handshake() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(is_upgrade_request(&headers));
    }

    #[test]
    fn upgrade_needs_both_headers() {
        let mut only_upgrade = HeaderMap::new();
        only_upgrade.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(!is_upgrade_request(&only_upgrade));

        let mut only_connection = HeaderMap::new();
        only_connection.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        assert!(!is_upgrade_request(&only_connection));

        let mut keep_alive = HeaderMap::new();
        keep_alive.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        keep_alive.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        assert!(!is_upgrade_request(&keep_alive));
    }

    #[test]
    fn outbound_uri_keeps_query_and_mounts_base_path() {
        let inbound: Uri = "/search?q=rust&page=2".parse().unwrap();

        let root = outbound_uri(&target("https://example.com"), &inbound).unwrap();
        assert_eq!(root.to_string(), "https://example.com/search?q=rust&page=2");

        let mounted = outbound_uri(&target("http://10.0.0.1:3000/v1"), &inbound).unwrap();
        assert_eq!(mounted.to_string(), "http://10.0.0.1:3000/v1/search?q=rust&page=2");
    }

    #[test]
    fn rewrite_replaces_host_and_keeps_everything_else() {
        let outbound = into_outbound(
            &target("http://upstream.test:9000/base"),
            request("/items/1?full=true"),
            HostHeader::Rewrite,
        )
        .unwrap();

        assert_eq!(outbound.method(), Method::POST);
        assert_eq!(outbound.version(), Version::HTTP_11);
        assert_eq!(outbound.uri().path_and_query().unwrap(), "/base/items/1?full=true");
        assert_eq!(outbound.headers()[header::HOST], "upstream.test:9000");
        assert_eq!(outbound.headers()["x-trace"], "abc");
        assert_eq!(outbound.headers().get_all("accept").iter().count(), 2);
    }

    #[test]
    fn rewrite_omits_default_port() {
        let outbound =
            into_outbound(&target("https://upstream.test"), request("/"), HostHeader::Rewrite)
                .unwrap();
        assert_eq!(outbound.headers()[header::HOST], "upstream.test");
    }

    #[test]
    fn preserve_keeps_client_host() {
        let outbound =
            into_outbound(&target("https://upstream.test"), request("/ws"), HostHeader::Preserve)
                .unwrap();
        assert_eq!(outbound.headers()[header::HOST], "proxy.local:8080");
        assert_eq!(outbound.uri().authority().unwrap(), "upstream.test");
    }
}
