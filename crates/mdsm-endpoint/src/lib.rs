//! Endpoints for MDSM.
//!
//! An endpoint is a URL that only certain kinds of client may call:
//!
//! - [`ClientClass`]: the label a client carries (`"browser"`, `"admin"`, …)
//! - [`Endpoint`]: URL + allowed classes + [`Handler`]
//! - [`EndpointRegistry`]: the immutable set of endpoints a session
//!   authorizes against
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)    ← rejects URLs the active registry doesn't know
//!     ↕
//! Session           ← matches the URL again in its own snapshot, checks
//!                     the client's class, invokes the handler
//!     ↕
//! Endpoint (this crate)
//! ```

mod class;
mod error;
mod handler;
mod registry;

pub use class::ClientClass;
pub use error::EndpointError;
pub use handler::{Handler, HandlerCall, HandlerFuture, SharedData, shared};
pub use registry::{Endpoint, EndpointRegistry, normalize};
