//! The request router: one request in, one outcome out.
//!
//! ```text
//! request
//!   │ no `mdsm` cookie ─────────────────────→ NoCookiePresent  (0)
//!   │ path not in active registry ──────────→ UnknownEndpoint  (3)
//!   │ cookie opens no live session ─────────→ InvalidCookie    (1)
//!   ▼
//! Session::process_request
//!   │ unknown client / expired session ─────→ InvalidCookie    (1)
//!   │ class not allowed ────────────────────→ Unauthorized     (2)
//!   │ path not in session's registry ───────→ UnknownEndpoint  (3)
//!   ▼
//! handler ──────────────────────────────────→ Dispatched(response)
//! ```
//!
//! The endpoint check runs before the cookie is opened, so an unknown path
//! answers the same whether or not the cookie is valid.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue, SET_COOKIE};
use http::{Request, Response, StatusCode};
use mdsm_cookie::{CookieOptions, build_clear_cookie, extract_cookie};
use mdsm_session::{SessionError, SessionManager};

// ---------------------------------------------------------------------------
// RouteOutcome
// ---------------------------------------------------------------------------

/// What happened to a request.
#[derive(Debug)]
pub enum RouteOutcome {
    /// The request carries no `mdsm` cookie. Code 0.
    NoCookiePresent,

    /// The cookie doesn't lead to a live client. Code 1.
    ///
    /// Covers cookies that fail to decrypt, name a missing or expired
    /// session, or name a client that has been removed.
    InvalidCookie,

    /// The client's class may not call this endpoint. Code 2.
    Unauthorized,

    /// No endpoint matches the request path. Code 3.
    UnknownEndpoint,

    /// The handler ran and produced this response.
    Dispatched(Response<Bytes>),
}

impl RouteOutcome {
    /// The numeric code of a rejection, `None` for a dispatched request.
    pub fn error_code(&self) -> Option<u8> {
        match self {
            Self::NoCookiePresent => Some(0),
            Self::InvalidCookie => Some(1),
            Self::Unauthorized => Some(2),
            Self::UnknownEndpoint => Some(3),
            Self::Dispatched(_) => None,
        }
    }

    /// Returns `true` if the handler ran.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }

    /// The HTTP response port mode sends for this outcome.
    ///
    /// An invalid cookie also gets a `Set-Cookie` that clears it, built
    /// with `cookie` so path and domain match the original.
    pub fn into_response(self, cookie: &CookieOptions) -> Response<Bytes> {
        let (status, body) = match self {
            Self::Dispatched(response) => return response,
            Self::NoCookiePresent => (StatusCode::BAD_REQUEST, "Not an MDSM request"),
            Self::InvalidCookie => (StatusCode::UNAUTHORIZED, "Invalid MDSM cookie"),
            Self::Unauthorized => (StatusCode::FORBIDDEN, "Client not allowed on this endpoint"),
            Self::UnknownEndpoint => (StatusCode::NOT_FOUND, "Unknown MDSM endpoint"),
        };

        let mut response = Response::new(Bytes::from_static(body.as_bytes()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if status == StatusCode::UNAUTHORIZED {
            match HeaderValue::try_from(build_clear_cookie(cookie)) {
                Ok(value) => {
                    response.headers_mut().insert(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "clearing cookie is not a valid header"),
            }
        }
        response
    }
}

// ---------------------------------------------------------------------------
// RequestRouter
// ---------------------------------------------------------------------------

/// Routes requests through a [`SessionManager`].
///
/// Cheap to clone; clones share the manager.
#[derive(Clone)]
pub struct RequestRouter {
    manager: SessionManager,
}

impl RequestRouter {
    /// Creates a router over `manager`.
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }

    /// The manager this router resolves cookies with.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Authorizes a request and, if allowed, runs its handler to completion.
    ///
    /// Never fails. Every rejection is an outcome. All session bookkeeping
    /// is finished and every lock released before the handler is first
    /// polled, so handlers may call back into the [`SessionManager`].
    pub async fn route(&self, request: Request<Bytes>) -> RouteOutcome {
        let Some(cookie) = extract_cookie(request.headers()) else {
            tracing::debug!(path = %request.uri().path(), "request without mdsm cookie");
            return RouteOutcome::NoCookiePresent;
        };

        if !self.manager.endpoints().await.is_valid(request.uri().path()) {
            tracing::debug!(path = %request.uri().path(), "unknown endpoint");
            return RouteOutcome::UnknownEndpoint;
        }

        let Some((session, payload)) = self.manager.find_session(&cookie).await else {
            return RouteOutcome::InvalidCookie;
        };

        match session.process_request(request, payload).await {
            Ok(handler) => RouteOutcome::Dispatched(handler.await),
            Err(SessionError::UnknownEndpoint(url)) => {
                tracing::debug!(session_id = %session.id(), %url, "endpoint not in session registry");
                RouteOutcome::UnknownEndpoint
            }
            Err(SessionError::Unauthorized { .. }) => RouteOutcome::Unauthorized,
            Err(SessionError::UnknownClient(_) | SessionError::SessionExpired(_)) => {
                RouteOutcome::InvalidCookie
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "unexpected session error");
                RouteOutcome::InvalidCookie
            }
        }
    }
}
