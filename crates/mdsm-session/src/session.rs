//! Sessions: server-side state for one authenticated agent.
//!
//! A session tracks:
//! - WHO it is (`id`, the lookup key carried in every cookie)
//! - WHEN it dies (`expires_at`, pushed out by renewals)
//! - WHAT it owns (application data and a [`ClientStore`])
//! - WHICH endpoints it authorizes against (a registry snapshot)

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Request;
use mdsm_cookie::CookiePayload;
use mdsm_endpoint::{
    ClientClass, EndpointRegistry, HandlerCall, HandlerFuture, SharedData, shared,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{Client, ClientStore, SessionError};

/// Upper bound used when a deadline computation would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `base` moved by `delta_ms` milliseconds.
///
/// Positive deltas saturate at `floor + FAR_FUTURE`; negative ones never
/// move the deadline before `floor`.
pub(crate) fn shift_deadline(base: Instant, delta_ms: i64, floor: Instant) -> Instant {
    let delta = Duration::from_millis(delta_ms.unsigned_abs());
    if delta_ms >= 0 {
        let cap = floor + FAR_FUTURE;
        base.checked_add(delta).map_or(cap, |d| d.min(cap))
    } else {
        base.checked_sub(delta).map_or(floor, |d| d.max(floor))
    }
}

// ---------------------------------------------------------------------------
// SessionOptions
// ---------------------------------------------------------------------------

/// Parameters for [`SessionManager::create_session`](crate::SessionManager::create_session).
///
/// ```rust
/// use mdsm_session::SessionOptions;
/// use serde_json::json;
///
/// let opts = SessionOptions::new()
///     .time_to_live_ms(10_000)
///     .data(json!({"bar": "baz"}));
/// assert!(opts.id.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Explicit session ID. A random one is generated when `None`.
    pub id: Option<String>,

    /// Time until the session becomes eligible for expiry.
    ///
    /// Default: zero, i.e. eligible as soon as its first check runs.
    pub time_to_live: Duration,

    /// Application data. Default: `Value::Null`.
    pub data: Value,
}

impl SessionOptions {
    /// Options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `id` instead of a generated ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the time-to-live.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Sets the time-to-live in milliseconds.
    pub fn time_to_live_ms(self, ttl_ms: u64) -> Self {
        self.time_to_live(Duration::from_millis(ttl_ms))
    }

    /// Sets the application data.
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///            renew()
///           ┌──────┐
///           ▼      │
///        Active ───┘
///           │
///           │ clock passes expires_at
///           ▼
///        Expired ──attempt_self_destruct()──→ Destroyed
/// ```
///
/// `Expired` is not a stored state. It is the predicate
/// `now >= expires_at`, evaluated whenever someone asks. Only `Destroyed`
/// is recorded, and it is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The deadline is still ahead.
    Active,
    /// The deadline has passed but nobody has destroyed the session yet.
    Expired,
    /// The session is gone. It will never authorize another request.
    Destroyed,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable part of a session, guarded by one lock.
#[derive(Debug)]
struct SessionState {
    expires_at: Instant,
    destroyed: bool,
    clients: ClientStore,
}

impl SessionState {
    fn status(&self, now: Instant) -> SessionStatus {
        if self.destroyed {
            SessionStatus::Destroyed
        } else if now >= self.expires_at {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }
}

/// A single session.
///
/// Always handled as `Arc<Session>`: the manager owns the collection entry,
/// the router and embedders hold clones while they work with it.
#[derive(Debug)]
pub struct Session {
    id: String,
    data: SharedData,
    endpoints: Arc<EndpointRegistry>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        time_to_live: Duration,
        data: Value,
        endpoints: Arc<EndpointRegistry>,
    ) -> Self {
        let now = Instant::now();
        let ttl_ms = i64::try_from(time_to_live.as_millis()).unwrap_or(i64::MAX);
        Self {
            id,
            data: shared(data),
            endpoints,
            state: Mutex::new(SessionState {
                expires_at: shift_deadline(now, ttl_ms, now),
                destroyed: false,
                clients: ClientStore::new(),
            }),
        }
    }

    /// The session ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's application data.
    pub fn data(&self) -> &SharedData {
        &self.data
    }

    /// The endpoint registry this session authorizes against.
    pub fn endpoints(&self) -> &Arc<EndpointRegistry> {
        &self.endpoints
    }

    /// The current deadline.
    pub async fn expires_at(&self) -> Instant {
        self.state.lock().await.expires_at
    }

    /// Time left until the deadline (zero once it has passed).
    pub async fn time_to_live(&self) -> Duration {
        self.expires_at()
            .await
            .saturating_duration_since(Instant::now())
    }

    /// The session's lifecycle status right now.
    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status(Instant::now())
    }

    /// Returns `true` if the deadline has passed (or the session is gone).
    pub async fn is_expired(&self) -> bool {
        self.status().await != SessionStatus::Active
    }

    /// Returns `true` once the session has been destroyed.
    pub async fn is_destroyed(&self) -> bool {
        self.state.lock().await.destroyed
    }

    // -- Clients ----------------------------------------------------------

    /// Adds a client and returns the (unencrypted) cookie payload for it.
    ///
    /// Sealing the payload is the caller's job; see
    /// [`SessionManager::add_client`](crate::SessionManager::add_client).
    ///
    /// # Errors
    /// Returns [`SessionError::SessionDestroyed`] on a destroyed session.
    pub async fn add_client(
        &self,
        class: impl Into<ClientClass>,
        data: Value,
    ) -> Result<CookiePayload, SessionError> {
        let mut state = self.state.lock().await;
        if state.destroyed {
            return Err(SessionError::SessionDestroyed(self.id.clone()));
        }

        let client = state.clients.add(class.into(), data);
        tracing::info!(
            session_id = %self.id,
            client_id = %client.id(),
            class = %client.class(),
            "client added"
        );
        Ok(CookiePayload::new(self.id.clone(), client.id()))
    }

    /// Removes a client. Returns `false` if there was no such client.
    ///
    /// Cookies issued for the client stop working immediately.
    pub async fn remove_client(&self, client_id: &str) -> bool {
        let removed = self.state.lock().await.clients.remove(client_id).is_some();
        if removed {
            tracing::info!(session_id = %self.id, %client_id, "client removed");
        }
        removed
    }

    /// Looks up a client by ID.
    pub async fn client(&self, client_id: &str) -> Option<Client> {
        self.state.lock().await.clients.find(client_id).cloned()
    }

    /// The class of a client.
    pub async fn client_class(&self, client_id: &str) -> Option<ClientClass> {
        self.client(client_id).await.map(|c| c.class().clone())
    }

    /// The data handle of a client.
    pub async fn client_data(&self, client_id: &str) -> Option<SharedData> {
        self.client(client_id).await.map(|c| Arc::clone(c.data()))
    }

    /// IDs of all clients, in the order they were added.
    pub async fn client_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .clients
            .ids()
            .map(str::to_string)
            .collect()
    }

    /// Returns the number of clients.
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    // -- Requests ---------------------------------------------------------

    /// Authorizes a request and starts the endpoint's handler.
    ///
    /// Steps, in order:
    /// 1. the session must be alive (not expired, not destroyed);
    /// 2. the cookie's client must exist in this session;
    /// 3. the URL must match an endpoint in this session's registry;
    /// 4. the client's class must be allowed by that endpoint.
    ///
    /// Only then is the handler invoked. Its future is returned without
    /// being polled and no session lock is held while it runs.
    ///
    /// # Errors
    /// [`SessionError::SessionExpired`], [`SessionError::UnknownClient`],
    /// [`SessionError::UnknownEndpoint`] or [`SessionError::Unauthorized`].
    pub async fn process_request(
        &self,
        request: Request<Bytes>,
        cookie: CookiePayload,
    ) -> Result<HandlerFuture, SessionError> {
        let client = {
            let state = self.state.lock().await;
            if state.status(Instant::now()) != SessionStatus::Active {
                return Err(SessionError::SessionExpired(self.id.clone()));
            }
            if cookie.session_id != self.id {
                tracing::warn!(
                    session_id = %self.id,
                    cookie_session = %cookie.session_id,
                    "cookie presented to the wrong session"
                );
                return Err(SessionError::UnknownClient(cookie.client_id));
            }
            state
                .clients
                .find(&cookie.client_id)
                .cloned()
                .ok_or_else(|| SessionError::UnknownClient(cookie.client_id.clone()))?
        };

        let url = request.uri().path().to_string();
        let endpoint = self
            .endpoints
            .find(&url)
            .ok_or_else(|| SessionError::UnknownEndpoint(url.clone()))?;

        if !endpoint.allows(client.class()) {
            tracing::debug!(
                session_id = %self.id,
                client_id = %client.id(),
                class = %client.class(),
                url = %endpoint.url(),
                "client class not allowed"
            );
            return Err(SessionError::Unauthorized {
                class: client.class().clone(),
                url: endpoint.url().to_string(),
            });
        }

        tracing::debug!(
            session_id = %self.id,
            client_id = %client.id(),
            url = %endpoint.url(),
            "dispatching to handler"
        );
        Ok(endpoint.invoke(HandlerCall {
            session_data: Arc::clone(&self.data),
            client_data: Arc::clone(client.data()),
            request,
            cookie,
        }))
    }

    // -- Lifetime ---------------------------------------------------------

    /// Moves the deadline by `extra_ms` milliseconds and returns the new one.
    ///
    /// There is no upper bound. A negative value shortens the session's
    /// life but never moves the deadline before "now".
    ///
    /// # Errors
    /// Returns [`SessionError::SessionDestroyed`] on a destroyed session.
    pub async fn renew(&self, extra_ms: i64) -> Result<Instant, SessionError> {
        let mut state = self.state.lock().await;
        if state.destroyed {
            return Err(SessionError::SessionDestroyed(self.id.clone()));
        }
        state.expires_at = shift_deadline(state.expires_at, extra_ms, Instant::now());
        tracing::debug!(session_id = %self.id, extra_ms, "session renewed");
        Ok(state.expires_at)
    }

    /// Destroys the session if, right now, its deadline has passed.
    ///
    /// Returns `true` if the session is destroyed after the call (including
    /// when it already was). A renewal that landed between scheduling the
    /// check and running it makes this return `false`.
    ///
    /// Removing the session from the manager's collection is the
    /// manager's job; this only flips the session's own state.
    pub async fn attempt_self_destruct(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.status(Instant::now()) {
            SessionStatus::Active => false,
            SessionStatus::Destroyed => true,
            SessionStatus::Expired => {
                state.destroyed = true;
                state.clients.clear();
                true
            }
        }
    }

    /// Destroys the session unconditionally, dropping all of its clients.
    pub(crate) async fn destroy(&self) {
        let mut state = self.state.lock().await;
        state.destroyed = true;
        state.clients.clear();
    }
}
