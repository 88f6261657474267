//! Endpoints and the registry that matches request URLs against them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::{ClientClass, EndpointError, Handler, HandlerCall, HandlerFuture};

/// Normalizes a URL path for matching: leading and trailing `/` are
/// removed, everything in between is kept as-is.
///
/// `"/a/b/"`, `"a/b"` and `"//a/b//"` all become `"a/b"`, and normalizing
/// twice gives the same result as normalizing once.
pub fn normalize(url: &str) -> &str {
    url.trim_matches('/')
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A URL, the client classes allowed to call it, and the handler that runs
/// when one of them does.
///
/// Immutable once built. Cloning is cheap: the handler is shared.
#[derive(Clone)]
pub struct Endpoint {
    url: String,
    allowed: HashSet<ClientClass>,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    /// Creates an endpoint. The URL is normalized here.
    pub fn new<I, C>(url: &str, allowed: I, handler: impl Handler) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClientClass>,
    {
        Self {
            url: normalize(url).to_string(),
            allowed: allowed.into_iter().map(Into::into).collect(),
            handler: Arc::new(handler),
        }
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The classes allowed to call this endpoint.
    pub fn allowed_classes(&self) -> &HashSet<ClientClass> {
        &self.allowed
    }

    /// Returns `true` if clients of `class` may call this endpoint.
    pub fn allows(&self, class: &ClientClass) -> bool {
        self.allowed.contains(class)
    }

    /// Starts the handler. The returned future is the handler's own; the
    /// caller decides when (and whether) to await it.
    pub fn invoke(&self, call: HandlerCall) -> HandlerFuture {
        self.handler.call(call)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut allowed: Vec<_> = self.allowed.iter().map(ClientClass::as_str).collect();
        allowed.sort_unstable();
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("allowed", &allowed)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EndpointRegistry
// ---------------------------------------------------------------------------

/// An immutable snapshot of every registered endpoint.
///
/// Built once from a list and never modified. Re-initializing means
/// building a new registry and swapping it in as a whole; sessions created
/// under the old snapshot keep using it.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    /// Endpoints in registration order.
    endpoints: Vec<Endpoint>,

    /// Normalized URL → index into `endpoints`.
    index: HashMap<String, usize>,
}

impl EndpointRegistry {
    /// Builds a registry.
    ///
    /// # Errors
    /// Returns [`EndpointError::Duplicate`] if two endpoints share a
    /// normalized URL.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, EndpointError> {
        let mut index = HashMap::with_capacity(endpoints.len());
        for (i, endpoint) in endpoints.iter().enumerate() {
            if index.insert(endpoint.url.clone(), i).is_some() {
                return Err(EndpointError::Duplicate(endpoint.url.clone()));
            }
        }

        tracing::debug!(count = endpoints.len(), "endpoint registry built");
        Ok(Self { endpoints, index })
    }

    /// Returns the endpoint registered for `url`, if any.
    pub fn find(&self, url: &str) -> Option<&Endpoint> {
        self.index
            .get(normalize(url))
            .map(|&i| &self.endpoints[i])
    }

    /// Returns `true` if some endpoint is registered for `url`.
    pub fn is_valid(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    /// Iterates over the normalized URLs in registration order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(Endpoint::url)
    }

    /// Returns the number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no endpoint is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
