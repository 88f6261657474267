//! Turning PEM text into a rustls server configuration.

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::TransportError;

/// PEM-encoded TLS material for the HTTPS listener.
#[derive(Clone)]
pub struct TlsPem {
    /// The private key (PKCS#8, PKCS#1 or SEC1). Must not be encrypted.
    pub key: String,
    /// The server certificate, optionally followed by intermediates.
    pub cert: String,
    /// Extra CA certificates appended to the served chain.
    pub ca: Option<String>,
}

impl std::fmt::Debug for TlsPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsPem")
            .field("key", &"<redacted>")
            .field("cert_len", &self.cert.len())
            .field("ca", &self.ca.is_some())
            .finish()
    }
}

fn certificates(pem: &str, what: &str) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    CertificateDer::pem_slice_iter(pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(format!("{what}: {e}")))
}

/// Builds a server configuration from PEM material.
///
/// # Errors
/// Returns [`TransportError::Tls`] if the key or certificates don't parse,
/// if `cert` holds no certificate, or if rustls rejects the pair.
pub fn server_config(pem: &TlsPem) -> Result<Arc<ServerConfig>, TransportError> {
    let mut chain = certificates(&pem.cert, "cert")?;
    if chain.is_empty() {
        return Err(TransportError::Tls("cert: no certificate found".into()));
    }
    if let Some(ca) = &pem.ca {
        chain.extend(certificates(ca, "ca")?);
    }

    let key = PrivateKeyDer::from_pem_slice(pem.key.as_bytes())
        .map_err(|e| TransportError::Tls(format!("key: {e}")))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .map_err(|e| TransportError::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}
