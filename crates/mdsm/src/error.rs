//! Unified error type for MDSM.

use mdsm_cookie::CookieError;
use mdsm_endpoint::EndpointError;
use mdsm_session::SessionError;
use mdsm_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `mdsm` meta-crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum MdsmError {
    /// A cookie could not be sealed or opened.
    #[error(transparent)]
    Cookie(#[from] CookieError),

    /// The endpoint list is invalid (duplicate URL).
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A session operation failed (not found, duplicate ID, destroyed).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The port-mode listener failed (bind, TLS material, socket).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cookie_error() {
        let err: MdsmError = CookieError::Decryption.into();
        assert!(matches!(err, MdsmError::Cookie(_)));
    }

    #[test]
    fn test_from_endpoint_error() {
        let err: MdsmError = EndpointError::Duplicate("api/x".into()).into();
        assert!(matches!(err, MdsmError::Endpoint(_)));
        assert!(err.to_string().contains("api/x"));
    }

    #[test]
    fn test_from_session_error() {
        let err: MdsmError = SessionError::NotFound("s1".into()).into();
        assert!(matches!(err, MdsmError::Session(_)));
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn test_from_transport_error() {
        let err: MdsmError = TransportError::Tls("bad key".into()).into();
        assert!(matches!(err, MdsmError::Transport(_)));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_config_error_message() {
        let err = MdsmError::Config("no port".into());
        assert_eq!(err.to_string(), "invalid configuration: no port");
    }
}
