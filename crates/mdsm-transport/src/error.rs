use std::net::SocketAddr;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address we tried to bind.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TLS material could not be turned into a server configuration.
    #[error("tls configuration: {0}")]
    Tls(String),

    /// Any other socket error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
