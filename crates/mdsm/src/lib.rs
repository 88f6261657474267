//! # MDSM
//!
//! Multi-device session management over encrypted cookies.
//!
//! A server creates a session, adds clients to it (one per browser, device
//! or role) and hands each client an encrypted `mdsm` cookie. Every request
//! that comes back with that cookie is checked against the endpoint it
//! targets: only clients of an allowed class reach the handler. Sessions
//! die on their own once their time-to-live runs out, unless renewed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http::Response;
//! use mdsm::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), MdsmError> {
//! let mdsm = Mdsm::builder()
//!     .port(8080)
//!     .endpoint(Endpoint::new("/api/doSomething1/", ["class_A"], |call: HandlerCall| async move {
//!         let bar = call.session_data.lock().await["bar"].clone();
//!         Response::new(Bytes::from(bar.to_string()))
//!     }))
//!     .build()?;
//!
//! let session = mdsm
//!     .create_session(SessionOptions::new().time_to_live_ms(10_000).data(json!({"bar": "baz"})))
//!     .await?;
//! if let Some(cookie) = mdsm.add_client(&session, "class_A", json!({"foo": "bar"})).await {
//!     println!("Set-Cookie: {}", mdsm.set_cookie_header(&cookie));
//! }
//! mdsm.serve().await
//! # }
//! ```

mod app;
mod config;
mod error;
mod router;

pub use app::{Mdsm, MdsmBuilder};
pub use config::{HttpsConfig, MdsmConfig, Mode};
pub use error::MdsmError;
pub use router::{RequestRouter, RouteOutcome};

pub use mdsm_cookie as cookie;
pub use mdsm_endpoint as endpoint;
pub use mdsm_session as session;
pub use mdsm_transport as transport;

/// Commonly used types, re-exported for convenience.
///
/// ```rust
/// use mdsm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        HttpsConfig, Mdsm, MdsmBuilder, MdsmConfig, MdsmError, Mode, RequestRouter, RouteOutcome,
    };
    pub use mdsm_cookie::{CookieOptions, CookiePayload, SameSite};
    pub use mdsm_endpoint::{ClientClass, Endpoint, HandlerCall, SharedData};
    pub use mdsm_session::{Session, SessionManager, SessionOptions, SessionRef};
}
