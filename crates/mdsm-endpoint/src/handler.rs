//! The `Handler` trait: the extension point for endpoint business logic.
//!
//! MDSM never looks inside a handler. It decides *whether* a handler may
//! run (valid cookie, known endpoint, allowed class) and then hands it
//! everything it needs in one [`HandlerCall`].

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Request, Response};
use mdsm_cookie::CookiePayload;
use serde_json::Value;
use tokio::sync::Mutex;

/// Application data owned by a session or a client.
///
/// Shared so a handler can read and update it while the session keeps
/// ownership. The lock is never held by MDSM itself while a handler runs.
pub type SharedData = Arc<Mutex<Value>>;

/// The future a handler returns.
pub type HandlerFuture = BoxFuture<'static, Response<Bytes>>;

/// Everything a handler receives for one authorized request.
#[derive(Debug)]
pub struct HandlerCall {
    /// The session's application data.
    pub session_data: SharedData,

    /// The calling client's application data.
    pub client_data: SharedData,

    /// The request, with its body already collected.
    pub request: Request<Bytes>,

    /// The decrypted cookie that authenticated the request.
    pub cookie: CookiePayload,
}

/// Business logic behind one endpoint.
///
/// `Send + Sync + 'static` because a single handler instance serves every
/// request to its endpoint, from whatever task the request arrives on.
///
/// Any `Fn(HandlerCall) -> impl Future<Output = Response<Bytes>>` closure
/// is a handler:
///
/// ```rust
/// use bytes::Bytes;
/// use http::Response;
/// use mdsm_endpoint::{Endpoint, HandlerCall};
///
/// let endpoint = Endpoint::new("/api/hello/", ["browser"], |call: HandlerCall| async move {
///     let name = call.client_data.lock().await["name"].as_str().unwrap_or("stranger").to_string();
///     Response::new(Bytes::from(format!("hello {name}")))
/// });
/// assert_eq!(endpoint.url(), "api/hello");
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Runs the endpoint's logic for one request.
    fn call(&self, call: HandlerCall) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Bytes>> + Send + 'static,
{
    fn call(&self, call: HandlerCall) -> HandlerFuture {
        Box::pin(self(call))
    }
}

/// Wraps a value as [`SharedData`].
pub fn shared(value: Value) -> SharedData {
    Arc::new(Mutex::new(value))
}
