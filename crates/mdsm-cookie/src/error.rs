//! Error types for the cookie layer.

/// Errors that can occur while sealing or opening an MDSM cookie.
///
/// Every variant except [`Encryption`](Self::Encryption) describes a cookie
/// the server cannot trust. Callers treat them all the same way: the cookie
/// is unrecognized, the request carries no identity.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// The cookie value is not valid base64url.
    #[error("cookie is not valid base64: {0}")]
    Encoding(#[source] base64::DecodeError),

    /// The decoded cookie is too short to hold a nonce and an auth tag.
    #[error("cookie truncated: {0} bytes")]
    Truncated(usize),

    /// Authentication failed: the cookie was tampered with, or it was
    /// sealed under a different key (for example before a restart).
    #[error("cookie decryption failed")]
    Decryption,

    /// The cipher refused to seal the plaintext.
    #[error("cookie encryption failed")]
    Encryption,

    /// The plaintext is not a valid cookie payload.
    #[error("invalid cookie payload: {0}")]
    Payload(#[source] serde_json::Error),
}
