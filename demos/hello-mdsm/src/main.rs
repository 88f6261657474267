use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Bytes;
use http::{Response, StatusCode};
use mdsm::prelude::*;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Everyone in the session can read the shared counter.
async fn read_counter(call: HandlerCall) -> Response<Bytes> {
    let count = call.session_data.lock().await["count"].clone();
    let name = call.client_data.lock().await["name"].clone();
    json_response(StatusCode::OK, json!({"count": count, "you": name}))
}

/// Only editors may bump it.
async fn increment(call: HandlerCall) -> Response<Bytes> {
    let mut data = call.session_data.lock().await;
    let count = data["count"].as_u64().unwrap_or(0) + 1;
    data["count"] = json!(count);
    json_response(StatusCode::OK, json!({"count": count}))
}

fn json_response(status: StatusCode, body: Value) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

fn build(host: IpAddr, port: u16) -> Result<Mdsm, MdsmError> {
    Mdsm::builder()
        .host(host)
        .port(port)
        // Plain HTTP: browsers drop Secure cookies on it.
        .cookie_options(CookieOptions {
            secure: false,
            ..CookieOptions::default()
        })
        .endpoint(Endpoint::new("/api/counter/", ["viewer", "editor"], read_counter))
        .endpoint(Endpoint::new("/api/increment/", ["editor"], increment))
        .build()
}

/// Creates one hour-long session with an editor and a viewer and returns
/// their cookies.
async fn seed(mdsm: &Mdsm) -> Result<(String, String), MdsmError> {
    let session = mdsm
        .create_session(
            SessionOptions::new()
                .time_to_live_ms(3_600_000)
                .data(json!({"count": 0})),
        )
        .await?;

    let editor = mdsm.add_client(&session, "editor", json!({"name": "alice"})).await;
    let viewer = mdsm.add_client(&session, "viewer", json!({"name": "bob"})).await;
    match (editor, viewer) {
        (Some(editor), Some(viewer)) => Ok((editor, viewer)),
        _ => Err(MdsmError::Config("seed session vanished".into())),
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("MDSM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let mdsm = build(IpAddr::V4(Ipv4Addr::LOCALHOST), port)?;
    let listener = mdsm.bind().await?;
    let addr: SocketAddr = listener.local_addr();

    let (editor, viewer) = seed(&mdsm).await?;
    eprintln!("try:");
    eprintln!("  curl -b 'mdsm={editor}' http://{addr}/api/increment/");
    eprintln!("  curl -b 'mdsm={viewer}' http://{addr}/api/counter/");
    eprintln!("  curl -b 'mdsm={viewer}' http://{addr}/api/increment/   # 403");

    mdsm.serve_listener(listener, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}
