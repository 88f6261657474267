//! Configuration: how MDSM is exposed and how its cookie is set.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use mdsm_cookie::CookieOptions;
use mdsm_transport::{TlsPem, server_config};
use serde::Deserialize;

use crate::MdsmError;

// ---------------------------------------------------------------------------
// HttpsConfig
// ---------------------------------------------------------------------------

/// PEM material for serving HTTPS in port mode.
///
/// All fields hold PEM *contents*, not file paths.
#[derive(Clone, Deserialize)]
pub struct HttpsConfig {
    /// The private key.
    pub key: String,

    /// The certificate (optionally followed by intermediates).
    pub cert: String,

    /// Passphrase for an encrypted key. Not supported: setting it makes
    /// [`MdsmConfig::validate`] fail.
    #[serde(default)]
    pub passphrase: Option<String>,

    /// CA certificates appended to the served chain.
    #[serde(default)]
    pub ca: Option<String>,
}

impl HttpsConfig {
    /// Key and certificate, no passphrase, no extra CA.
    pub fn new(key: impl Into<String>, cert: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cert: cert.into(),
            passphrase: None,
            ca: None,
        }
    }
}

impl fmt::Debug for HttpsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpsConfig")
            .field("key", &"<redacted>")
            .field("cert_len", &self.cert.len())
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("ca", &self.ca.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How requests reach MDSM.
///
/// ```text
/// Port:        socket ──→ MDSM listener ──→ router ──→ HTTP response
/// Middleware:  embedder's server ──→ Mdsm::process_request ──→ RouteOutcome
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mode {
    /// MDSM owns a listener and answers every request itself.
    Port {
        /// TCP port. `0` picks a free one.
        port: u16,

        /// Interface to bind. Default: all IPv4 interfaces.
        #[serde(default = "default_host")]
        host: IpAddr,

        /// Serve HTTPS instead of plain HTTP.
        #[serde(default)]
        https: Option<HttpsConfig>,
    },

    /// The embedder feeds requests in and decides what to answer.
    #[default]
    Middleware,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

// ---------------------------------------------------------------------------
// MdsmConfig
// ---------------------------------------------------------------------------

/// Everything about an MDSM instance that isn't code.
///
/// Endpoints carry handlers and therefore can't come from a file; they are
/// given to the builder separately.
///
/// ```rust
/// use mdsm::{MdsmConfig, Mode};
///
/// let config = MdsmConfig::from_json(r#"{"mode": {"type": "port", "port": 8443}}"#).unwrap();
/// assert!(matches!(config.mode, Mode::Port { port: 8443, https: None, .. }));
/// assert_eq!(config.cookie.path, "/");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MdsmConfig {
    /// Port or middleware mode. Default: middleware.
    pub mode: Mode,

    /// Attributes of the `Set-Cookie` headers MDSM builds.
    pub cookie: CookieOptions,
}

impl MdsmConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, MdsmError> {
        serde_json::from_str(text).map_err(|e| MdsmError::Config(e.to_string()))
    }

    /// The socket address port mode binds, or `None` in middleware mode.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        match &self.mode {
            Mode::Port { port, host, .. } => Some(SocketAddr::new(*host, *port)),
            Mode::Middleware => None,
        }
    }

    /// Checks the configuration and prepares TLS if HTTPS is requested.
    ///
    /// # Errors
    /// [`MdsmError::Config`] if a key passphrase is set, or
    /// [`MdsmError::Transport`] if the PEM material is unusable.
    pub fn validate(&self) -> Result<Option<Arc<rustls::ServerConfig>>, MdsmError> {
        let Mode::Port {
            https: Some(https), ..
        } = &self.mode
        else {
            return Ok(None);
        };

        if https.passphrase.is_some() {
            return Err(MdsmError::Config(
                "encrypted private keys are not supported; decrypt the key and drop the passphrase"
                    .into(),
            ));
        }

        let tls = server_config(&TlsPem {
            key: https.key.clone(),
            cert: https.cert.clone(),
            ca: https.ca.clone(),
        })?;
        Ok(Some(tls))
    }
}
