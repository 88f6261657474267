//! Session and client lifecycle for MDSM.
//!
//! This crate handles everything that lives between two requests:
//!
//! 1. **Sessions**: server-side state with a deadline ([`Session`])
//! 2. **Clients**: sub-identities inside a session, each with its own
//!    cookie and class ([`Client`])
//! 3. **Expiry**: per-session timers plus lazy checks on lookup
//!    ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← turns cookies into sessions, errors into outcomes
//!     ↕
//! Session Layer (this crate)  ← owns sessions, clients and their deadlines
//!     ↕
//! Cookie + Endpoint Layers (below)  ← sealed payloads, URL → handler
//! ```

mod client;
mod error;
mod id;
mod manager;
mod session;

pub use client::{Client, ClientStore};
pub use error::SessionError;
pub use manager::{SessionManager, SessionRef};
pub use session::{Session, SessionOptions, SessionStatus};
