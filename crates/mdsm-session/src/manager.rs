//! The session manager: owns every live session.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Creating sessions and scheduling their expiry checks
//! - Finding the session behind an encrypted cookie
//! - Issuing cookies for new clients
//! - Renewing, expiring and removing sessions
//!
//! # Concurrency
//!
//! `SessionManager` is a cheap-to-clone handle around shared state. The
//! session collection sits behind one `tokio::sync::Mutex`; each session
//! has its own lock for its deadline and clients. Locks are always taken
//! collection first, session second, and are never held while a handler
//! runs.
//!
//! # Expiry
//!
//! Every session gets one timer task. It sleeps until the session's
//! deadline, then asks the session whether it is still expired
//! ([`Session::attempt_self_destruct`]). If yes the session is removed; if
//! a renewal pushed the deadline out in the meantime, the task goes back to
//! sleep until the new deadline. Renewals therefore never have to cancel
//! anything.
//!
//! ```text
//! create_session() ──→ [timer: sleep until expires_at]
//!                               │
//!                  attempt_self_destruct()?
//!                     │ false            │ true
//!                     ▼                  ▼
//!         sleep until new deadline   remove from collection
//! ```
//!
//! Authorization lookups don't depend on the timer being punctual: a
//! session found past its deadline by [`SessionManager::find_session`] or
//! [`SessionManager::get`] is destroyed on the spot and reported as missing.
//! Renewing and adding clients only refuse sessions that are already
//! destroyed, so a renewal that lands before the check fires still rescues
//! the session.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use mdsm_cookie::{CookieCodec, CookiePayload};
use mdsm_endpoint::{ClientClass, Endpoint, EndpointError, EndpointRegistry};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::id::generate_id;
use crate::{Session, SessionError, SessionOptions};

// ---------------------------------------------------------------------------
// SessionRef
// ---------------------------------------------------------------------------

/// Names the session a client should be added to: either a handle the
/// caller already holds, or a session ID to look up.
#[derive(Debug, Clone)]
pub enum SessionRef {
    /// A session handle, e.g. the one returned by `create_session`.
    Handle(Arc<Session>),
    /// A session ID.
    Id(String),
}

impl From<Arc<Session>> for SessionRef {
    fn from(session: Arc<Session>) -> Self {
        Self::Handle(session)
    }
}

impl From<&Arc<Session>> for SessionRef {
    fn from(session: &Arc<Session>) -> Self {
        Self::Handle(Arc::clone(session))
    }
}

impl From<String> for SessionRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for SessionRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// A live session plus the handle of its expiry timer.
struct Entry {
    session: Arc<Session>,
    expiry: AbortHandle,
}

struct Inner {
    /// All live sessions, keyed by session ID.
    sessions: Mutex<HashMap<String, Entry>>,

    /// The registry new sessions are created with. Replaced wholesale.
    endpoints: RwLock<Arc<EndpointRegistry>>,

    /// Seals and opens cookies. One key for the manager's whole lifetime.
    codec: CookieCodec,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.sessions.get_mut().values() {
            entry.expiry.abort();
        }
    }
}

/// Manages all live sessions.
///
/// ## Lifecycle
///
/// ```text
/// SessionManager::new(registry)
///        │
///        ├── create_session() / add_client() / find_session() / renew_session()
///        │
///        ▼
/// shutdown()  (or drop the last handle)
/// ```
///
/// Must be used from inside a Tokio runtime: creating a session spawns its
/// expiry timer.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Creates an empty manager with a fresh cookie key.
    pub fn new(endpoints: EndpointRegistry) -> Self {
        Self::with_codec(endpoints, CookieCodec::generate())
    }

    /// Creates an empty manager that seals cookies with `codec`.
    pub fn with_codec(endpoints: EndpointRegistry, codec: CookieCodec) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                endpoints: RwLock::new(Arc::new(endpoints)),
                codec,
            }),
        }
    }

    /// The codec cookies are sealed with.
    pub fn codec(&self) -> &CookieCodec {
        &self.inner.codec
    }

    /// The registry new sessions are created with.
    pub async fn endpoints(&self) -> Arc<EndpointRegistry> {
        Arc::clone(&*self.inner.endpoints.read().await)
    }

    /// Builds a registry from `endpoints` and makes it the active one.
    ///
    /// Existing sessions keep the registry they were created with.
    ///
    /// # Errors
    /// Returns [`EndpointError::Duplicate`] and leaves the active registry
    /// untouched if two endpoints share a URL.
    pub async fn register_endpoints(
        &self,
        endpoints: Vec<Endpoint>,
    ) -> Result<(), EndpointError> {
        let registry = Arc::new(EndpointRegistry::new(endpoints)?);
        *self.inner.endpoints.write().await = registry;
        tracing::info!("endpoint registry replaced");
        Ok(())
    }

    // -- Sessions ---------------------------------------------------------

    /// Creates a session and schedules its first expiry check.
    ///
    /// # Errors
    /// - [`SessionError::InvalidSessionId`]: explicit ID is empty
    /// - [`SessionError::DuplicateSessionId`]: explicit ID already live
    pub async fn create_session(
        &self,
        opts: SessionOptions,
    ) -> Result<Arc<Session>, SessionError> {
        let endpoints = self.endpoints().await;
        let mut sessions = self.inner.sessions.lock().await;

        let id = match opts.id {
            Some(id) if id.is_empty() => return Err(SessionError::InvalidSessionId),
            Some(id) => {
                if self.live(&mut sessions, &id).await.is_some() {
                    return Err(SessionError::DuplicateSessionId(id));
                }
                id
            }
            None => loop {
                let candidate = generate_id();
                if !sessions.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let session = Arc::new(Session::new(
            id.clone(),
            opts.time_to_live,
            opts.data,
            endpoints,
        ));
        let expiry = spawn_expiry(
            Arc::downgrade(&self.inner),
            Arc::clone(&session),
            session.expires_at().await,
        );
        sessions.insert(
            id.clone(),
            Entry {
                session: Arc::clone(&session),
                expiry,
            },
        );

        tracing::info!(
            session_id = %id,
            ttl_ms = opts.time_to_live.as_millis() as u64,
            "session created"
        );
        Ok(session)
    }

    /// Finds the session an encrypted cookie points at.
    ///
    /// Never fails: a cookie that doesn't decrypt, doesn't parse, or names
    /// a session that is gone or past its deadline all give `None`. Callers
    /// cannot tell those cases apart, and neither can the client.
    pub async fn find_session(
        &self,
        cookie: &str,
    ) -> Option<(Arc<Session>, CookiePayload)> {
        let payload = match self.inner.codec.open(cookie) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(error = %e, "rejected mdsm cookie");
                return None;
            }
        };

        let mut sessions = self.inner.sessions.lock().await;
        let live = self.live(&mut sessions, &payload.session_id).await;
        match live {
            Some(session) => Some((session, payload)),
            None => {
                tracing::debug!(
                    session_id = %payload.session_id,
                    "cookie names no live session"
                );
                None
            }
        }
    }

    /// Looks up a live session by ID.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let mut sessions = self.inner.sessions.lock().await;
        self.live(&mut sessions, id).await
    }

    /// Extends a session's deadline by `extra_ms` milliseconds.
    ///
    /// A session past its deadline whose expiry check hasn't run yet is
    /// still renewed; the check then reschedules instead of destroying it.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the collection holds no
    /// undestroyed session with this ID.
    pub async fn renew_session(
        &self,
        id: &str,
        extra_ms: i64,
    ) -> Result<Instant, SessionError> {
        let sessions = self.inner.sessions.lock().await;
        let session = resolve(&sessions, id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.renew(extra_ms).await
    }

    /// Adds a client to a session and returns its encrypted cookie.
    ///
    /// Returns `None` if the session can't be resolved: unknown or destroyed
    /// ID, or a handle to a session this manager no longer holds. Like
    /// [`renew_session`](Self::renew_session), a session whose expiry check
    /// hasn't run yet still accepts clients.
    pub async fn add_client(
        &self,
        target: impl Into<SessionRef>,
        class: impl Into<ClientClass>,
        data: Value,
    ) -> Option<String> {
        let session = {
            let sessions = self.inner.sessions.lock().await;
            match target.into() {
                SessionRef::Handle(session) => {
                    let current = resolve(&sessions, session.id()).await?;
                    if !Arc::ptr_eq(&current, &session) {
                        tracing::debug!(session_id = %session.id(), "stale session handle");
                        return None;
                    }
                    current
                }
                SessionRef::Id(id) => resolve(&sessions, &id).await?,
            }
        };

        let payload = match session.add_client(class, data).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(error = %e, "could not add client");
                return None;
            }
        };

        match self.inner.codec.seal(&payload) {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::warn!(error = %e, "could not seal cookie");
                None
            }
        }
    }

    /// Destroys a session right away, whatever its deadline.
    ///
    /// Returns `false` if no session had this ID.
    pub async fn remove_session(&self, id: &str) -> bool {
        let entry = self.inner.sessions.lock().await.remove(id);
        match entry {
            Some(entry) => {
                entry.expiry.abort();
                entry.session.destroy().await;
                tracing::info!(session_id = %id, "session removed");
                true
            }
            None => false,
        }
    }

    /// IDs of every session in the collection.
    pub async fn session_ids(&self) -> Vec<String> {
        self.inner.sessions.lock().await.keys().cloned().collect()
    }

    /// Returns the number of sessions in the collection, including any
    /// past their deadline whose check hasn't run yet.
    pub async fn len(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    /// Returns `true` if the collection is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.sessions.lock().await.is_empty()
    }

    /// Destroys every session and stops every timer.
    ///
    /// The manager stays usable afterwards; it is simply empty.
    pub async fn shutdown(&self) {
        let drained: Vec<Entry> = {
            let mut sessions = self.inner.sessions.lock().await;
            sessions.drain().map(|(_, entry)| entry).collect()
        };
        let count = drained.len();
        for entry in drained {
            entry.expiry.abort();
            entry.session.destroy().await;
        }
        tracing::info!(count, "session manager shut down");
    }

    /// Returns the session with `id` unless it is past its deadline, in
    /// which case it is destroyed and removed first.
    async fn live(
        &self,
        sessions: &mut HashMap<String, Entry>,
        id: &str,
    ) -> Option<Arc<Session>> {
        let session = Arc::clone(&sessions.get(id)?.session);
        if session.attempt_self_destruct().await {
            if let Some(entry) = sessions.remove(id) {
                entry.expiry.abort();
            }
            tracing::info!(session_id = %id, "session expired");
            return None;
        }
        Some(session)
    }
}

/// Returns the session with `id` unless it has been destroyed. Never
/// destroys anything itself.
async fn resolve(sessions: &HashMap<String, Entry>, id: &str) -> Option<Arc<Session>> {
    let session = Arc::clone(&sessions.get(id)?.session);
    if session.is_destroyed().await {
        return None;
    }
    Some(session)
}

/// Spawns the expiry timer for one session.
///
/// The task holds the manager weakly and exits as soon as the manager is
/// gone or the session has left the collection.
fn spawn_expiry(
    manager: Weak<Inner>,
    session: Arc<Session>,
    first_deadline: Instant,
) -> AbortHandle {
    let id = session.id().to_string();
    let session = Arc::downgrade(&session);

    tokio::spawn(async move {
        let mut deadline = first_deadline;
        loop {
            tokio::time::sleep_until(deadline).await;

            let Some(inner) = manager.upgrade() else { return };
            let Some(session) = session.upgrade() else { return };
            let mut sessions = inner.sessions.lock().await;

            // The collection may hold a different session under this ID
            // by now (removed, then re-created with an explicit ID).
            let current = sessions
                .get(&id)
                .is_some_and(|entry| Arc::ptr_eq(&entry.session, &session));
            if !current {
                return;
            }

            if session.attempt_self_destruct().await {
                sessions.remove(&id);
                tracing::info!(session_id = %id, "session expired");
                return;
            }

            deadline = session.expires_at().await;
            tracing::trace!(session_id = %id, "session renewed, expiry rescheduled");
        }
    })
    .abort_handle()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! Time-dependent tests run with `start_paused = true`: Tokio's clock
    //! only moves when every task is idle, jumping straight to the next
    //! timer. A 10-second TTL costs nothing and fires exactly on time.

    use std::time::Duration;

    use serde_json::json;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn manager() -> SessionManager {
        SessionManager::new(EndpointRegistry::default())
    }

    fn ttl(ms: u64) -> SessionOptions {
        SessionOptions::new().time_to_live_ms(ms)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // =====================================================================
    // create_session()
    // =====================================================================

    #[tokio::test]
    async fn test_create_session_defaults() {
        let mgr = manager();

        let session = mgr.create_session(ttl(60_000)).await.unwrap();

        assert_eq!(session.id().len(), 32);
        assert_eq!(*session.data().lock().await, Value::Null);
        assert_eq!(mgr.len().await, 1);
        assert!(mgr.get(session.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_create_session_with_explicit_id() {
        let mgr = manager();

        let session = mgr.create_session(ttl(60_000).id("fixed")).await.unwrap();

        assert_eq!(session.id(), "fixed");
        assert_eq!(mgr.session_ids().await, vec!["fixed".to_string()]);
    }

    #[tokio::test]
    async fn test_create_session_duplicate_id_fails() {
        let mgr = manager();
        mgr.create_session(ttl(60_000).id("fixed")).await.unwrap();

        let result = mgr.create_session(ttl(60_000).id("fixed")).await;

        assert!(matches!(result, Err(SessionError::DuplicateSessionId(id)) if id == "fixed"));
    }

    #[tokio::test]
    async fn test_create_session_empty_id_fails() {
        let mgr = manager();
        let result = mgr.create_session(ttl(1).id("")).await;
        assert!(matches!(result, Err(SessionError::InvalidSessionId)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_session_reuses_id_of_expired_session() {
        let mgr = manager();
        let old = mgr.create_session(ttl(0).id("fixed")).await.unwrap();

        let new = mgr.create_session(ttl(60_000).id("fixed")).await.unwrap();

        assert!(old.is_destroyed().await);
        assert!(!Arc::ptr_eq(&old, &new));
        sleep_ms(1).await;
        assert_eq!(mgr.len().await, 1, "old timer must not remove the new session");
    }

    #[tokio::test]
    async fn test_create_session_ten_thousand_ids_never_collide() {
        let mgr = manager();
        for _ in 0..10_000 {
            mgr.create_session(ttl(3_600_000)).await.unwrap();
        }
        let mut ids = mgr.session_ids().await;
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10_000);
    }

    // =====================================================================
    // expiry
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_session_removed_once_check_fires() {
        let mgr = manager();
        let session = mgr.create_session(SessionOptions::new()).await.unwrap();

        sleep_ms(1).await;

        assert!(mgr.is_empty().await);
        assert!(session.is_destroyed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_alive_until_deadline() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();

        sleep_ms(999).await;
        assert_eq!(mgr.len().await, 1);

        sleep_ms(2).await;
        assert!(mgr.is_empty().await);
        assert!(mgr.get(session.id()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_before_check_moves_destruction_to_new_deadline() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();

        sleep_ms(500).await;
        mgr.renew_session(session.id(), 1_000).await.unwrap();

        // Past the original deadline: the first check ran and rescheduled.
        sleep_ms(1_000).await;
        assert_eq!(mgr.len().await, 1);
        assert!(!session.is_expired().await);

        // Past the new deadline (t = 2000).
        sleep_ms(501).await;
        assert!(mgr.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_repeatedly_keeps_session_alive() {
        let mgr = manager();
        let session = mgr.create_session(ttl(100)).await.unwrap();

        for _ in 0..10 {
            sleep_ms(90).await;
            mgr.renew_session(session.id(), 100).await.unwrap();
        }

        assert_eq!(mgr.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_past_deadline_destroys_before_timer() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();

        // Move the clock without letting the timer task run.
        tokio::time::advance(Duration::from_millis(1_000)).await;

        assert!(mgr.get(session.id()).await.is_none());
        assert!(session.is_destroyed().await);
        assert!(mgr.is_empty().await);
    }

    // =====================================================================
    // renew_session()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_renew_session_after_deadline_before_check_rescues() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();

        // Past the deadline, timer task not polled yet.
        tokio::time::advance(Duration::from_millis(1_000)).await;
        mgr.renew_session(session.id(), 5_000).await.unwrap();

        sleep_ms(1).await;
        assert_eq!(mgr.len().await, 1);
        assert!(!session.is_destroyed().await);
        assert!(!session.is_expired().await);

        sleep_ms(5_000).await;
        assert!(mgr.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_session_zero_ttl_before_check_rescues() {
        let mgr = manager();
        let session = mgr.create_session(SessionOptions::new()).await.unwrap();

        mgr.renew_session(session.id(), 5_000).await.unwrap();

        sleep_ms(1).await;
        assert_eq!(mgr.len().await, 1);
        assert!(!session.is_expired().await);
        assert!(session.time_to_live().await > Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_session_destroyed_is_not_found() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();

        sleep_ms(1_001).await;

        let result = mgr.renew_session(session.id(), 5_000).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_renew_session_unknown_id_is_not_found() {
        let mgr = manager();
        let result = mgr.renew_session("missing", 1_000).await;
        assert!(matches!(result, Err(SessionError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_session_returns_new_deadline() {
        let mgr = manager();
        let session = mgr.create_session(ttl(1_000)).await.unwrap();
        let before = session.expires_at().await;

        let after = mgr.renew_session(session.id(), 250).await.unwrap();

        assert_eq!(after, before + Duration::from_millis(250));
    }

    // =====================================================================
    // add_client() / find_session()
    // =====================================================================

    #[tokio::test]
    async fn test_add_client_by_handle_and_id_both_issue_cookies() {
        let mgr = manager();
        let session = mgr.create_session(ttl(60_000)).await.unwrap();

        let by_handle = mgr.add_client(&session, "a", Value::Null).await;
        let by_id = mgr.add_client(session.id(), "b", Value::Null).await;

        assert!(by_handle.is_some());
        assert!(by_id.is_some());
        assert_eq!(session.client_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_client_zero_ttl_before_check_issues_cookie() {
        let mgr = manager();
        let session = mgr.create_session(SessionOptions::new()).await.unwrap();

        let by_handle = mgr.add_client(&session, "a", Value::Null).await;
        let by_id = mgr.add_client(session.id(), "b", Value::Null).await;

        assert!(by_handle.is_some());
        assert!(by_id.is_some());
        assert_eq!(session.client_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_client_after_check_fired_is_none() {
        let mgr = manager();
        let session = mgr.create_session(SessionOptions::new()).await.unwrap();

        sleep_ms(1).await;

        assert!(mgr.add_client(&session, "a", Value::Null).await.is_none());
        assert!(mgr.add_client(session.id(), "a", Value::Null).await.is_none());
    }

    #[tokio::test]
    async fn test_add_client_unknown_session_is_none() {
        let mgr = manager();
        assert!(mgr.add_client("missing", "a", Value::Null).await.is_none());
    }

    #[tokio::test]
    async fn test_add_client_handle_from_other_manager_is_none() {
        let mgr = manager();
        let other = manager();
        let foreign = other.create_session(ttl(60_000).id("same")).await.unwrap();
        mgr.create_session(ttl(60_000).id("same")).await.unwrap();

        assert!(mgr.add_client(&foreign, "a", Value::Null).await.is_none());
    }

    #[tokio::test]
    async fn test_find_session_round_trips_cookie() {
        let mgr = manager();
        let session = mgr.create_session(ttl(60_000)).await.unwrap();
        let cookie = mgr.add_client(&session, "a", json!({"foo": "bar"})).await.unwrap();

        let (found, payload) = mgr.find_session(&cookie).await.expect("should find");

        assert!(Arc::ptr_eq(&found, &session));
        assert_eq!(payload.session_id, session.id());
        assert_eq!(session.client_ids().await, vec![payload.client_id]);
    }

    #[tokio::test]
    async fn test_find_session_garbage_is_none() {
        let mgr = manager();
        mgr.create_session(ttl(60_000)).await.unwrap();

        for cookie in ["", "garbage", "%%%", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"] {
            assert!(mgr.find_session(cookie).await.is_none(), "{cookie:?}");
        }
    }

    #[tokio::test]
    async fn test_find_session_cookie_from_other_manager_is_none() {
        let mgr = manager();
        let other = manager();
        let session = other.create_session(ttl(60_000).id("same")).await.unwrap();
        mgr.create_session(ttl(60_000).id("same")).await.unwrap();
        let cookie = other.add_client(&session, "a", Value::Null).await.unwrap();

        assert!(mgr.find_session(&cookie).await.is_none());
    }

    #[tokio::test]
    async fn test_find_session_forged_payload_for_missing_session_is_none() {
        let mgr = manager();
        let cookie = mgr
            .codec()
            .seal(&CookiePayload::new("nope", "nope"))
            .unwrap();
        assert!(mgr.find_session(&cookie).await.is_none());
    }

    // =====================================================================
    // remove_session() / shutdown()
    // =====================================================================

    #[tokio::test]
    async fn test_remove_session_destroys_and_invalidates_cookies() {
        let mgr = manager();
        let session = mgr.create_session(ttl(60_000)).await.unwrap();
        let cookie = mgr.add_client(&session, "a", Value::Null).await.unwrap();

        assert!(mgr.remove_session(session.id()).await);
        assert!(!mgr.remove_session(session.id()).await);

        assert!(session.is_destroyed().await);
        assert_eq!(session.client_count().await, 0);
        assert!(mgr.find_session(&cookie).await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_empties_manager() {
        let mgr = manager();
        let a = mgr.create_session(ttl(60_000)).await.unwrap();
        let b = mgr.create_session(ttl(60_000)).await.unwrap();

        mgr.shutdown().await;

        assert!(mgr.is_empty().await);
        assert!(a.is_destroyed().await);
        assert!(b.is_destroyed().await);
        // Still usable.
        assert!(mgr.create_session(ttl(60_000)).await.is_ok());
    }

    // =====================================================================
    // register_endpoints()
    // =====================================================================

    #[tokio::test]
    async fn test_register_endpoints_only_affects_new_sessions() {
        use bytes::Bytes;
        use http::Response;

        let mgr = manager();
        let old = mgr.create_session(ttl(60_000)).await.unwrap();

        let handler = |_call: mdsm_endpoint::HandlerCall| async { Response::new(Bytes::new()) };
        mgr.register_endpoints(vec![Endpoint::new("/x/", ["a"], handler)])
            .await
            .unwrap();
        let new = mgr.create_session(ttl(60_000)).await.unwrap();

        assert!(old.endpoints().is_empty());
        assert!(new.endpoints().is_valid("x"));
        assert!(mgr.endpoints().await.is_valid("/x/"));
    }

    #[tokio::test]
    async fn test_register_endpoints_duplicate_keeps_active_registry() {
        use bytes::Bytes;
        use http::Response;

        let handler = |_call: mdsm_endpoint::HandlerCall| async { Response::new(Bytes::new()) };
        let mgr = SessionManager::new(
            EndpointRegistry::new(vec![Endpoint::new("/keep/", ["a"], handler)]).unwrap(),
        );

        let result = mgr
            .register_endpoints(vec![
                Endpoint::new("/x/", ["a"], handler),
                Endpoint::new("x", ["b"], handler),
            ])
            .await;

        assert!(matches!(result, Err(EndpointError::Duplicate(_))));
        assert!(mgr.endpoints().await.is_valid("keep"));
    }
}
