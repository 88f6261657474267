//! End-to-end tests in port mode, over a real socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Bytes;
use http::Response;
use mdsm::prelude::*;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

// =========================================================================
// Helpers
// =========================================================================

struct Running {
    mdsm: Mdsm,
    addr: SocketAddr,
    _stop: oneshot::Sender<()>,
}

async fn start() -> Running {
    let mdsm = Mdsm::builder()
        .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .port(0)
        .endpoint(Endpoint::new(
            "/api/doSomething1/",
            ["class_A"],
            |call: HandlerCall| async move {
                let bar = call.session_data.lock().await["bar"].clone();
                Response::new(Bytes::from(format!("bar={}", bar.as_str().unwrap_or(""))))
            },
        ))
        .build()
        .unwrap();

    let listener = mdsm.bind().await.unwrap();
    let addr = listener.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = mdsm.clone();
    tokio::spawn(async move {
        server
            .serve_listener(listener, async move {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });

    Running {
        mdsm,
        addr,
        _stop: stop,
    }
}

/// Sends one HTTP/1.1 request and returns the whole response as text.
async fn send(addr: SocketAddr, path: &str, cookie: Option<&str>) -> String {
    let cookie_header = cookie
        .map(|c| format!("Cookie: mdsm={c}\r\n"))
        .unwrap_or_default();
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: localhost\r\n{cookie_header}Connection: close\r\n\r\n"
    );

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

async fn client_cookie(mdsm: &Mdsm, class: &str) -> String {
    let session = mdsm
        .create_session(
            SessionOptions::new()
                .time_to_live_ms(10_000)
                .data(json!({"bar": "baz"})),
        )
        .await
        .unwrap();
    mdsm.add_client(&session, class, json!({"foo": "bar"}))
        .await
        .unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_dispatched_request_gets_handler_response() {
    let running = start().await;
    let cookie = client_cookie(&running.mdsm, "class_A").await;

    let response = send(running.addr, "/api/doSomething1/", Some(&cookie)).await;

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("bar=baz"), "{response}");
}

#[tokio::test]
async fn test_no_cookie_is_400() {
    let running = start().await;

    let response = send(running.addr, "/api/doSomething1/", None).await;

    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.ends_with("Not an MDSM request"), "{response}");
}

#[tokio::test]
async fn test_invalid_cookie_is_401_and_cleared() {
    let running = start().await;

    let response = send(running.addr, "/api/doSomething1/", Some("garbage")).await;

    assert!(response.starts_with("HTTP/1.1 401"), "{response}");
    assert!(
        response.to_ascii_lowercase().contains("set-cookie: mdsm=;"),
        "{response}"
    );
}

#[tokio::test]
async fn test_wrong_class_is_403() {
    let running = start().await;
    let cookie = client_cookie(&running.mdsm, "class_B").await;

    let response = send(running.addr, "/api/doSomething1/", Some(&cookie)).await;

    assert!(response.starts_with("HTTP/1.1 403"), "{response}");
}

#[tokio::test]
async fn test_unknown_endpoint_is_404() {
    let running = start().await;
    let cookie = client_cookie(&running.mdsm, "class_A").await;

    let response = send(running.addr, "/api/doesNotExist/", Some(&cookie)).await;

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
}
