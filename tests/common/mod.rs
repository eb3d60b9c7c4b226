//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use upstream_relay::config::{ProxyConfig, Target};
use upstream_relay::http::HttpServer;
use upstream_relay::lifecycle::Shutdown;
use upstream_relay::net::Listener;

/// Size of the `/large` body.
pub const LARGE_BODY_LEN: usize = 1 << 20;

pub fn large_body() -> Vec<u8> {
    (0..LARGE_BODY_LEN).map(|i| (i % 251) as u8).collect()
}

/// Start an axum upstream.
///
/// - `/teapot`: fixed 418 with a custom header
/// - `/large`: 1 MiB deterministic body
/// - `/ws`: WebSocket echo (`echo: <text>`)
/// - anything else: echoes the body, reports method/path/host in headers
pub async fn start_mock_backend() -> SocketAddr {
    let app = Router::new()
        .route("/teapot", get(teapot))
        .route("/large", get(|| async { large_body() }))
        .route("/ws", get(ws_echo))
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, [("x-upstream", "teapot")], "short and stout")
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    (
        [
            ("x-seen-method", method.to_string()),
            ("x-seen-path", uri.to_string()),
            ("x-seen-host", host),
        ],
        body,
    )
}

async fn ws_echo(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        while let Some(Ok(msg)) = socket.recv().await {
            let reply = match msg {
                Message::Text(text) => Message::Text(format!("echo: {}", text.as_str()).into()),
                Message::Binary(data) => Message::Binary(data),
                Message::Close(_) => break,
                _ => continue,
            };
            if socket.send(reply).await.is_err() {
                break;
            }
        }
    })
}

/// What the raw upgrade upstream answers, byte for byte.
pub const UPSTREAM_ANSWER: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: raw-test\r\n\r\nHELLO";

/// Start a raw TCP upstream that accepts one upgrade.
///
/// It stays silent until `expected_head` has arrived directly behind the
/// handshake's blank line, reports the handshake, writes [`UPSTREAM_ANSWER`],
/// then echoes every byte it got after the handshake, `expected_head`
/// included.
pub async fn start_raw_upgrade_backend(
    expected_head: &'static [u8],
) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut received = Vec::new();
        let head_end = loop {
            if let Some(pos) = find(&received, b"\r\n\r\n") {
                if received.len() >= pos + 4 + expected_head.len() {
                    break pos + 4;
                }
            }
            let mut chunk = [0u8; 1024];
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before handshake finished");
            received.extend_from_slice(&chunk[..n]);
        };
        let leftover = received.split_off(head_end);
        assert!(
            leftover.starts_with(expected_head),
            "bytes after the handshake were {:?}",
            String::from_utf8_lossy(&leftover)
        );
        let _ = tx.send(String::from_utf8_lossy(&received).into_owned());

        socket.write_all(UPSTREAM_ANSWER).await.unwrap();
        socket.write_all(&leftover).await.unwrap();

        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    (addr, rx)
}

/// Start a raw TCP upstream that promises 100 body bytes, sends 7, then hangs
/// up.
pub async fn start_truncating_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut received = Vec::new();
                while find(&received, b"\r\n\r\n").is_none() {
                    let mut chunk = [0u8; 1024];
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => received.extend_from_slice(&chunk[..n]),
                    }
                }
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nX-Upstream: truncated\r\n\r\npartial")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start the relay in front of `target` on an ephemeral port.
pub async fn start_proxy(target: &str) -> (SocketAddr, Shutdown) {
    let config = ProxyConfig::new(Target::parse(target).unwrap());
    let server = HttpServer::new(config).unwrap();
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read from `stream` until `needle` shows up; panics after five seconds.
pub async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while find(&received, needle).is_none() {
            let mut chunk = [0u8; 4096];
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream closed before {:?} arrived", String::from_utf8_lossy(needle));
            received.extend_from_slice(&chunk[..n]);
        }
    })
    .await
    .expect("timed out waiting for bytes");
    received
}
