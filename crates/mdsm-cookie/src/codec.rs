//! The cookie codec: AES-256-GCM sealing of cookie payloads.
//!
//! # Wire format
//!
//! ```text
//! base64url_nopad( nonce[12] ‖ ciphertext ‖ tag[16] )
//! ```
//!
//! A fresh random nonce is drawn for every cookie, so sealing the same
//! payload twice yields two different strings. The GCM tag covers the whole
//! ciphertext: flipping any bit, truncating, or presenting a cookie sealed
//! under another key fails with [`CookieError::Decryption`].

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;

use crate::{CookieError, CookiePayload};

/// Length of the AES-GCM nonce in bytes (96 bits).
const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Seals and opens MDSM cookies with a key that lives only in memory.
///
/// The key is drawn from the OS random number generator when the codec is
/// created and never leaves it: there is no accessor, `Debug` prints a
/// placeholder, and nothing serializes it. Create one codec per process
/// (the session manager does this) so that every cookie issued during the
/// process lifetime can be opened again, and none issued before a restart
/// can.
#[derive(Clone)]
pub struct CookieCodec {
    cipher: Aes256Gcm,
}

impl CookieCodec {
    /// Creates a codec with a freshly generated 256-bit key.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypts raw bytes into a cookie-safe string.
    ///
    /// # Errors
    /// Returns [`CookieError::Encryption`] only if the cipher rejects the
    /// input length, which cannot happen for cookie-sized plaintext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CookieError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CookieError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&sealed);
        Ok(BASE64.encode(out))
    }

    /// Decrypts a string produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    /// - [`CookieError::Encoding`]: not base64url
    /// - [`CookieError::Truncated`]: shorter than nonce + tag
    /// - [`CookieError::Decryption`]: tampered, or sealed by another key
    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CookieError> {
        let raw = BASE64
            .decode(ciphertext.trim())
            .map_err(CookieError::Encoding)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CookieError::Truncated(raw.len()));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CookieError::Decryption)
    }

    /// Serializes a payload to compact JSON and encrypts it.
    pub fn seal(&self, payload: &CookiePayload) -> Result<String, CookieError> {
        let json = serde_json::to_vec(payload).map_err(CookieError::Payload)?;
        self.encrypt(&json)
    }

    /// Decrypts a cookie and parses its payload.
    pub fn open(&self, cookie: &str) -> Result<CookiePayload, CookieError> {
        let plaintext = self.decrypt(cookie)?;
        serde_json::from_slice(&plaintext).map_err(CookieError::Payload)
    }
}

impl Default for CookieCodec {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}
