//! Error types for the session layer.

use mdsm_endpoint::ClientClass;

/// Errors that can occur during session management and request processing.
///
/// The request-time variants (`UnknownClient`, `UnknownEndpoint`,
/// `Unauthorized`, `SessionExpired`) are routine: they describe what a
/// client asked for, not a server fault. The router turns them into
/// outcomes instead of propagating them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session has this ID.
    #[error("session {0} not found")]
    NotFound(String),

    /// A session was created with an explicit ID that is already live.
    #[error("session {0} already exists")]
    DuplicateSessionId(String),

    /// An explicit session ID was empty.
    #[error("session id must not be empty")]
    InvalidSessionId,

    /// The session has been destroyed; it accepts no further changes.
    #[error("session {0} has been destroyed")]
    SessionDestroyed(String),

    /// The session's deadline has passed; it may not authorize requests.
    #[error("session {0} has expired")]
    SessionExpired(String),

    /// The cookie names a client that is not (or no longer) in the session.
    #[error("client {0} not found in session")]
    UnknownClient(String),

    /// No endpoint in the session's registry matches the URL.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The client's class is not allowed to call the endpoint.
    #[error("client class {class} may not call {url}")]
    Unauthorized {
        /// The class of the calling client.
        class: ClientClass,
        /// The normalized endpoint URL.
        url: String,
    },
}
