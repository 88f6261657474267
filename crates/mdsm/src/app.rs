//! `Mdsm` builder and facade.
//!
//! This is the entry point for embedding MDSM. It ties together all the
//! layers: endpoints → sessions → router → (optionally) the listener.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use mdsm_cookie::{CookieOptions, build_set_cookie};
use mdsm_endpoint::{ClientClass, Endpoint, EndpointRegistry};
use mdsm_session::{Session, SessionManager, SessionOptions, SessionRef};
use mdsm_transport::{Listener, Service};
use serde_json::Value;
use tokio::time::Instant;

use crate::{HttpsConfig, MdsmConfig, MdsmError, Mode, RequestRouter, RouteOutcome};

/// Builder for configuring an MDSM instance.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use http::Response;
/// use mdsm::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), MdsmError> {
/// let mdsm = Mdsm::builder()
///     .endpoint(Endpoint::new("/api/hello/", ["browser"], |_call: HandlerCall| async {
///         Response::new(Bytes::from_static(b"hello"))
///     }))
///     .build()?;
/// assert!(mdsm.manager().endpoints().await.is_valid("api/hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MdsmBuilder {
    config: MdsmConfig,
    endpoints: Vec<Endpoint>,
}

impl MdsmBuilder {
    /// Creates a builder in middleware mode with no endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration. Endpoints are kept.
    pub fn config(mut self, config: MdsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Serves on `port`. Host and TLS settings already given are kept;
    /// otherwise plain HTTP on all interfaces.
    pub fn port(mut self, new_port: u16) -> Self {
        match &mut self.config.mode {
            Mode::Port { port, .. } => *port = new_port,
            Mode::Middleware => {
                self.config.mode = Mode::Port {
                    port: new_port,
                    host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    https: None,
                }
            }
        }
        self
    }

    /// Binds port mode to `host` instead of all interfaces.
    ///
    /// Switches to port mode on port 0 if no port was set yet.
    pub fn host(mut self, new_host: IpAddr) -> Self {
        match &mut self.config.mode {
            Mode::Port { host, .. } => *host = new_host,
            Mode::Middleware => {
                self.config.mode = Mode::Port {
                    port: 0,
                    host: new_host,
                    https: None,
                }
            }
        }
        self
    }

    /// Serves HTTPS with this TLS material.
    ///
    /// Switches to port mode on port 0 if no port was set yet.
    pub fn https(mut self, tls: HttpsConfig) -> Self {
        match &mut self.config.mode {
            Mode::Port { https, .. } => *https = Some(tls),
            Mode::Middleware => {
                self.config.mode = Mode::Port {
                    port: 0,
                    host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    https: Some(tls),
                }
            }
        }
        self
    }

    /// Leaves request intake to the embedder.
    pub fn middleware(mut self) -> Self {
        self.config.mode = Mode::Middleware;
        self
    }

    /// Sets the attributes of `Set-Cookie` headers.
    pub fn cookie_options(mut self, cookie: CookieOptions) -> Self {
        self.config.cookie = cookie;
        self
    }

    /// Registers one endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Registers several endpoints.
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Validates everything and creates the instance.
    ///
    /// Nothing is bound yet; see [`Mdsm::serve`].
    ///
    /// # Errors
    /// - [`MdsmError::Endpoint`]: two endpoints share a URL
    /// - [`MdsmError::Config`]: a key passphrase is set
    /// - [`MdsmError::Transport`]: TLS material doesn't parse
    pub fn build(self) -> Result<Mdsm, MdsmError> {
        let registry = EndpointRegistry::new(self.endpoints)?;
        let tls = self.config.validate()?;

        tracing::info!(
            endpoints = registry.len(),
            mode = mode_label(&self.config.mode, tls.is_some()),
            "mdsm configured"
        );
        let manager = SessionManager::new(registry);
        Ok(Mdsm {
            router: RequestRouter::new(manager.clone()),
            manager,
            config: Arc::new(self.config),
            tls,
        })
    }
}

fn mode_label(mode: &Mode, https: bool) -> &'static str {
    match mode {
        Mode::Middleware => "middleware",
        Mode::Port { .. } if https => "https",
        Mode::Port { .. } => "http",
    }
}

/// A configured MDSM instance.
///
/// Clones share the same sessions, so a clone can be handed to request
/// handlers while another one serves.
#[derive(Clone)]
pub struct Mdsm {
    manager: SessionManager,
    router: RequestRouter,
    config: Arc<MdsmConfig>,
    tls: Option<Arc<rustls::ServerConfig>>,
}

impl Mdsm {
    /// Creates a new builder.
    pub fn builder() -> MdsmBuilder {
        MdsmBuilder::new()
    }

    /// The session manager.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The request router.
    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// The configuration this instance was built with.
    pub fn config(&self) -> &MdsmConfig {
        &self.config
    }

    // -- Sessions ---------------------------------------------------------

    /// Creates a session. See [`SessionManager::create_session`].
    pub async fn create_session(&self, opts: SessionOptions) -> Result<Arc<Session>, MdsmError> {
        Ok(self.manager.create_session(opts).await?)
    }

    /// Adds a client and returns its encrypted cookie value.
    pub async fn add_client(
        &self,
        session: impl Into<SessionRef>,
        class: impl Into<ClientClass>,
        data: Value,
    ) -> Option<String> {
        self.manager.add_client(session, class, data).await
    }

    /// Extends a session's life by `extra_ms` milliseconds.
    pub async fn renew_session(&self, id: &str, extra_ms: i64) -> Result<Instant, MdsmError> {
        Ok(self.manager.renew_session(id, extra_ms).await?)
    }

    /// A `Set-Cookie` header value delivering `cookie` to the client.
    pub fn set_cookie_header(&self, cookie: &str) -> String {
        build_set_cookie(cookie, &self.config.cookie)
    }

    // -- Requests ---------------------------------------------------------

    /// Middleware entry point: routes one request and reports what happened.
    pub async fn process_request(&self, request: Request<Bytes>) -> RouteOutcome {
        self.router.route(request).await
    }

    /// The port-mode service: routes each request and turns the outcome
    /// into an HTTP response.
    pub fn service(&self) -> impl Service + use<> {
        let router = self.router.clone();
        let config = Arc::clone(&self.config);
        move |request: Request<Bytes>| {
            let router = router.clone();
            let config = Arc::clone(&config);
            async move { router.route(request).await.into_response(&config.cookie) }
        }
    }

    /// Binds the port-mode listener without serving yet.
    ///
    /// # Errors
    /// [`MdsmError::Config`] in middleware mode, [`MdsmError::Transport`]
    /// if the address can't be bound.
    pub async fn bind(&self) -> Result<Listener, MdsmError> {
        let addr = self
            .config
            .listen_addr()
            .ok_or_else(|| MdsmError::Config("serve() needs port mode".into()))?;
        Ok(Listener::bind(addr, self.tls.clone()).await?)
    }

    /// Binds and serves until the task is cancelled.
    pub async fn serve(&self) -> Result<(), MdsmError> {
        let listener = self.bind().await?;
        Ok(listener.serve(self.service()).await?)
    }

    /// Binds and serves until `shutdown` completes, then destroys every
    /// session.
    pub async fn serve_with_shutdown(
        &self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), MdsmError> {
        let listener = self.bind().await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` completes, then
    /// destroys every session.
    pub async fn serve_listener(
        &self,
        listener: Listener,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), MdsmError> {
        listener.serve_with_shutdown(self.service(), shutdown).await?;
        self.manager.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::Response;
    use mdsm_endpoint::HandlerCall;

    use super::*;

    fn endpoint(url: &str) -> Endpoint {
        Endpoint::new(url, ["a"], |_call: HandlerCall| async {
            Response::new(Bytes::new())
        })
    }

    #[test]
    fn test_build_duplicate_endpoint_fails() {
        let result = Mdsm::builder()
            .endpoint(endpoint("/x/"))
            .endpoint(endpoint("x"))
            .build();
        assert!(matches!(result, Err(MdsmError::Endpoint(_))));
    }

    #[test]
    fn test_build_passphrase_fails() {
        let mut https = HttpsConfig::new("key", "cert");
        https.passphrase = Some("secret".into());

        let result = Mdsm::builder().port(443).https(https).build();

        assert!(matches!(result, Err(MdsmError::Config(_))));
    }

    #[test]
    fn test_port_keeps_earlier_host_and_https() {
        let builder = Mdsm::builder()
            .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .https(HttpsConfig::new("k", "c"))
            .port(8443);

        match builder.config.mode {
            Mode::Port { port, host, https } => {
                assert_eq!(port, 8443);
                assert_eq!(host, IpAddr::V4(Ipv4Addr::LOCALHOST));
                assert!(https.is_some());
            }
            Mode::Middleware => panic!("expected port mode"),
        }
    }

    #[tokio::test]
    async fn test_bind_in_middleware_mode_fails() {
        let mdsm = Mdsm::builder().build().unwrap();
        assert!(matches!(mdsm.bind().await, Err(MdsmError::Config(_))));
    }

    #[tokio::test]
    async fn test_set_cookie_header_uses_cookie_options() {
        let mdsm = Mdsm::builder()
            .cookie_options(CookieOptions {
                secure: false,
                ..CookieOptions::default()
            })
            .build()
            .unwrap();

        let header = mdsm.set_cookie_header("abc");

        assert!(header.starts_with("mdsm=abc;"));
        assert!(!header.contains("Secure"));
    }

    #[tokio::test]
    async fn test_renew_unknown_session_is_session_error() {
        let mdsm = Mdsm::builder().build().unwrap();
        let result = mdsm.renew_session("missing", 1_000).await;
        assert!(matches!(result, Err(MdsmError::Session(_))));
    }
}
