//! First request head on a fresh client connection.
//!
//! # Responsibilities
//! - Read the client's header block straight off the socket
//! - Tell upgrade handshakes apart from ordinary requests
//! - Rebuild the handshake for the Target, original header spelling kept
//!
//! # Data Flow
//! ```text
//! TcpStream
//!     → sniff(): read until the header block is complete
//!         upgrade → Sniffed::Upgrade { handshake, head }  → upgrade.rs (raw splice)
//!         other   → Sniffed::Http(bytes read so far)      → hyper, bytes rewound
//! ```

use std::io;

use axum::http::Uri;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::Target;
use crate::http::request::{inbound_path, lists_upgrade};

/// Give up sniffing past this many bytes and let hyper judge the request.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

const MAX_HEADERS: usize = 100;

/// Upgrade request as the client wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    method: String,
    path: String,
    minor_version: u8,
    headers: Vec<(String, Vec<u8>)>,
}

/// Outcome of reading the first request head.
#[derive(Debug)]
pub enum Sniffed {
    /// Upgrade handshake plus the bytes that trailed its header block.
    Upgrade {
        handshake: ClientHandshake,
        head: Vec<u8>,
    },
    /// Anything else; carries every byte read so far.
    Http(Vec<u8>),
}

impl ClientHandshake {
    /// Parse a complete header block. `None` unless it is an upgrade request.
    ///
    /// Returns the handshake and the header block length.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, httparse::Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut request = httparse::Request::new(&mut headers);

        let len = match request.parse(buf)? {
            httparse::Status::Complete(len) => len,
            httparse::Status::Partial => return Ok(None),
        };

        let upgrade = request
            .headers
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case("upgrade"));
        let connection_upgrade = request
            .headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("connection"))
            .filter_map(|h| std::str::from_utf8(h.value).ok())
            .any(lists_upgrade);

        if !(upgrade && connection_upgrade) {
            return Ok(None);
        }

        let (Some(method), Some(path), Some(minor_version)) =
            (request.method, request.path, request.version)
        else {
            return Ok(None);
        };

        let handshake = Self {
            method: method.to_string(),
            path: path.to_string(),
            minor_version,
            headers: request
                .headers
                .iter()
                .map(|h| (h.name.to_string(), h.value.to_vec()))
                .collect(),
        };
        Ok(Some((handshake, len)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of the `Upgrade` header, lossily decoded.
    pub fn protocol(&self) -> String {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("upgrade"))
            .map(|(_, value)| String::from_utf8_lossy(value).into_owned())
            .unwrap_or_default()
    }

    /// Request line and header block for the Target, blank line included.
    ///
    /// The path is mounted under the Target's base path; method, version and
    /// every header (`Host` too) go out as received.
    pub fn encode(&self, target: &Target) -> Vec<u8> {
        let path = match self.path.parse::<Uri>() {
            Ok(uri) => target.outbound_path(inbound_path(&uri)),
            Err(_) => target.outbound_path(&self.path),
        };

        let mut out = format!("{} {} HTTP/1.{}\r\n", self.method, path, self.minor_version).into_bytes();
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// Read the first request head off `stream`.
///
/// Stops as soon as the header block is complete, on a parse error, at EOF or
/// past [`MAX_HEAD_LEN`]; only a complete upgrade handshake leaves the
/// connection to the raw path.
pub async fn sniff<S>(stream: &mut S) -> io::Result<Sniffed>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(4096);

    loop {
        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(Sniffed::Http(buf));
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        match httparse::Request::new(&mut headers).parse(&buf) {
            Ok(httparse::Status::Partial) if buf.len() < MAX_HEAD_LEN => {
                buf.reserve(4096);
                continue;
            }
            Ok(httparse::Status::Partial) | Err(_) => return Ok(Sniffed::Http(buf)),
            Ok(httparse::Status::Complete(_)) => {}
        }

        return Ok(match ClientHandshake::parse(&buf) {
            Ok(Some((handshake, len))) => {
                let head = buf.split_off(len);
                Sniffed::Upgrade { handshake, head }
            }
            _ => Sniffed::Http(buf),
        });
    }
}
