//! The HTTP/1.1 listener, plain or over TLS.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::{Service, TransportError};

/// Pause after a failed `accept()` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and feeds every request to a [`Service`].
///
/// Request bodies are collected before the service sees them, so services
/// work with plain `Request<Bytes>`.
pub struct Listener {
    tcp: TcpListener,
    tls: Option<TlsAcceptor>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds to `addr`. With `tls`, every connection must complete a TLS
    /// handshake before HTTP starts.
    pub async fn bind(
        addr: SocketAddr,
        tls: Option<Arc<ServerConfig>>,
    ) -> Result<Self, TransportError> {
        let tcp = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = tcp.local_addr()?;
        let tls = tls.map(TlsAcceptor::from);

        tracing::info!(
            addr = %local_addr,
            https = tls.is_some(),
            "mdsm listener bound"
        );
        Ok(Self {
            tcp,
            tls,
            local_addr,
        })
    }

    /// The address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until the task is cancelled.
    pub async fn serve(self, service: impl Service) -> Result<(), TransportError> {
        self.serve_with_shutdown(service, std::future::pending())
            .await
    }

    /// Serves until `shutdown` completes. Connections already accepted are
    /// left to finish on their own.
    pub async fn serve_with_shutdown(
        self,
        service: impl Service,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), TransportError> {
        let service: Arc<dyn Service> = Arc::new(service);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.tcp.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        // Errors like EMFILE persist; don't spin on them.
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                () = &mut shutdown => {
                    tracing::info!(addr = %self.local_addr, "mdsm listener stopped");
                    return Ok(());
                }
            };

            let service = Arc::clone(&service);
            let tls = self.tls.clone();
            tokio::spawn(async move {
                match tls {
                    None => serve_connection(stream, peer, service).await,
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(stream) => serve_connection(stream, peer, service).await,
                        Err(e) => tracing::debug!(%peer, error = %e, "tls handshake failed"),
                    },
                }
            });
        }
    }
}

async fn serve_connection<IO>(io: IO, peer: SocketAddr, service: Arc<dyn Service>)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
        let service = Arc::clone(&service);
        async move { Ok::<_, Infallible>(handle(req, service).await) }
    });

    if let Err(e) = hyper::server::conn::http1::Builder::new()
        .serve_connection(TokioIo::new(io), svc)
        .await
    {
        tracing::debug!(%peer, error = %e, "connection error");
    }
}

async fn handle(req: Request<Incoming>, service: Arc<dyn Service>) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            let mut response = Response::new(Full::new(Bytes::from_static(b"bad request body")));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };

    service
        .call(Request::from_parts(parts, body))
        .await
        .map(Full::new)
}

