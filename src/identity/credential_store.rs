// src/identity/credential_store.rs
//! In-memory store of credentials accepted from proof streams.
//!
//! Keyed by credential SAID. Re-parsing a stream that carries the same
//! credential overwrites the entry, so the store never holds duplicates.
//! The store holds at most `capacity` credentials; storing one more evicts
//! the least recently stored.

use crate::models::credential::Credential;
use std::collections::{HashMap, VecDeque};

/// Default number of credentials kept.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Credentials by SAID, bounded.
///
/// Not synchronized; owners wrap it in a `Mutex` when shared.
#[derive(Debug)]
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
    /// SAIDs from least to most recently stored
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding at most `capacity` credentials (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            credentials: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Stores a credential under its SAID, replacing any previous entry and
    /// evicting the oldest entries beyond capacity.
    pub fn store_credential(&mut self, credential: Credential) {
        let said = credential.said.clone();
        if self.credentials.insert(said.clone(), credential).is_some() {
            self.order.retain(|stored| *stored != said);
        }
        self.order.push_back(said);

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.credentials.remove(&evicted);
            }
        }
    }

    /// Retrieves a credential by SAID.
    ///
    /// # Returns
    /// - `Some(&Credential)` if found
    /// - `None` if no credential with that SAID is held
    pub fn get_credential(&self, said: &str) -> Option<&Credential> {
        self.credentials.get(said)
    }

    pub fn count_credentials(&self) -> usize {
        self.credentials.len()
    }
}
