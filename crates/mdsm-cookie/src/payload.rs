//! The logical content of an MDSM cookie.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an MDSM cookie says once it has been decrypted: which session,
/// and which client inside that session.
///
/// On the wire (before encryption) this is a compact JSON object:
///
/// ```text
/// {"sessionID":"4f0c…","clientID":"9a31…"}
/// ```
///
/// Nothing else goes into the cookie. Session and client data stay on the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookiePayload {
    /// The session this cookie belongs to.
    #[serde(rename = "sessionID")]
    pub session_id: String,

    /// The client within that session.
    #[serde(rename = "clientID")]
    pub client_id: String,
}

impl CookiePayload {
    /// Creates a payload from a session ID and a client ID.
    pub fn new(session_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for CookiePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_with_wire_field_names() {
        let payload = CookiePayload::new("s1", "c1");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"sessionID":"s1","clientID":"c1"}"#);
    }

    #[test]
    fn test_payload_rejects_unknown_fields() {
        let result: Result<CookiePayload, _> =
            serde_json::from_str(r#"{"sessionID":"s","clientID":"c","admin":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_rejects_missing_client_id() {
        let result: Result<CookiePayload, _> =
            serde_json::from_str(r#"{"sessionID":"s"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_display() {
        assert_eq!(CookiePayload::new("abc", "def").to_string(), "abc/def");
    }
}
