//! Port-mode transport for MDSM.
//!
//! Owns a listening socket and speaks HTTP/1.1 on it, optionally over TLS.
//! Everything MDSM-specific happens behind the [`Service`] trait; this
//! crate only moves requests in and responses out.

mod error;
mod listener;
mod tls;

pub use error::TransportError;
pub use listener::Listener;
pub use tls::{TlsPem, server_config};

use std::future::Future;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http::{Request, Response};

/// The future a [`Service`] returns.
pub type ServiceFuture = BoxFuture<'static, Response<Bytes>>;

/// Turns a fully-read request into a response.
///
/// Implemented for any `Fn(Request<Bytes>) -> impl Future<Output =
/// Response<Bytes>>` closure.
pub trait Service: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: Request<Bytes>) -> ServiceFuture;
}

impl<F, Fut> Service for F
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<Bytes>> + Send + 'static,
{
    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        Box::pin(self(request))
    }
}
