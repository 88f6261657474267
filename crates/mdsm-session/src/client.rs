//! Clients and the per-session store that owns them.
//!
//! A client is a sub-identity inside a session: one browser tab, one
//! device, one role. It is what an MDSM cookie ultimately points at.

use std::collections::HashMap;

use mdsm_endpoint::{ClientClass, SharedData, shared};
use serde_json::Value;

use crate::id::generate_id;

/// One client of a session.
///
/// The ID and class are fixed at creation. The data handle is shared with
/// handlers, so cloning a `Client` is cheap and sees the same data.
#[derive(Debug, Clone)]
pub struct Client {
    id: String,
    class: ClientClass,
    data: SharedData,
}

impl Client {
    /// The client's ID, unique within its session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The class endpoints authorize against.
    pub fn class(&self) -> &ClientClass {
        &self.class
    }

    /// The client's application data.
    pub fn data(&self) -> &SharedData {
        &self.data
    }
}

/// The clients of one session, in the order they were added.
///
/// Not synchronized by itself: it lives inside the session's lock, which
/// serializes every `add`/`remove` on the same session.
#[derive(Debug, Default)]
pub struct ClientStore {
    /// Client ID → client.
    clients: HashMap<String, Client>,

    /// Client IDs in insertion order. Kept in sync with `clients`.
    order: Vec<String>,
}

impl ClientStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client with a freshly generated ID and returns it.
    pub fn add(&mut self, class: ClientClass, data: Value) -> Client {
        let id = loop {
            let candidate = generate_id();
            if !self.clients.contains_key(&candidate) {
                break candidate;
            }
        };

        let client = Client {
            id: id.clone(),
            class,
            data: shared(data),
        };
        self.order.push(id.clone());
        self.clients.insert(id, client.clone());
        client
    }

    /// Removes a client. Returns `None` if there was no such client.
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        let client = self.clients.remove(id)?;
        self.order.retain(|other| other != id);
        Some(client)
    }

    /// Looks up a client by ID.
    pub fn find(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Client IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Removes every client.
    pub fn clear(&mut self) {
        self.clients.clear();
        self.order.clear();
    }

    /// Returns the number of clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if the store holds no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
