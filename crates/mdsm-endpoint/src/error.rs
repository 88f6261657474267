//! Error types for the endpoint layer.

/// Errors that can occur while building an endpoint registry.
///
/// These are configuration mistakes. They surface when the registry is
/// built, at startup, and never while serving requests.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Two endpoints normalize to the same URL.
    #[error("duplicate endpoint: {0}")]
    Duplicate(String),
}
