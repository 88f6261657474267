//! The MDSM cookie.
//!
//! A returning client is recognized by one encrypted cookie named `mdsm`.
//! This crate covers everything about that cookie and nothing else:
//!
//! - **Payload** ([`CookiePayload`]): the `{sessionID, clientID}` pair the
//!   cookie stands for.
//! - **Codec** ([`CookieCodec`]): AES-256-GCM sealing with a per-process
//!   key and a fresh nonce per cookie.
//! - **Headers** ([`extract_cookie`], [`build_set_cookie`],
//!   [`build_clear_cookie`]): getting the cookie in and out of HTTP.
//!
//! ```text
//! CookiePayload ──seal──→ "q0Jx…" ──Set-Cookie──→ browser
//! browser ──Cookie──→ "q0Jx…" ──open──→ CookiePayload
//! ```

mod codec;
mod error;
mod header;
mod payload;

pub use codec::CookieCodec;
pub use error::CookieError;
pub use header::{
    COOKIE_NAME, CookieOptions, SameSite, build_clear_cookie, build_set_cookie,
    extract_cookie,
};
pub use payload::CookiePayload;
