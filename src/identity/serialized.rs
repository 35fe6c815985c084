// src/identity/serialized.rs
//! Adapter for collaborators that report discoveries through a shared queue.
//!
//! Such a collaborator appends notices to one mutable queue as a side effect
//! of parsing. Two requests parsing at once would see each other's notices,
//! so the clear-parse-drain sequence runs under a single mutex and the
//! drained notices are handed back as the call's own result.

use crate::error::Result;
use crate::identity::{IdentityVerifier, Notice};
use crate::models::credential::Credential;
use std::sync::{Mutex, PoisonError};

/// A collaborator whose only output channel is a clearable notice queue.
pub trait NotificationQueue: Send {
    /// Discards every pending notice.
    fn clear(&mut self);

    /// Parses a proof stream, appending notices to the queue.
    fn parse_into_queue(&mut self, stream: &[u8]) -> Result<()>;

    /// Removes and returns every pending notice.
    fn drain(&mut self) -> Vec<Notice>;

    /// Looks up a credential the collaborator has accepted.
    fn credential(&self, said: &str) -> Option<Credential>;
}

/// Exposes a [`NotificationQueue`] as an [`IdentityVerifier`].
#[derive(Debug)]
pub struct SerializedQueue<Q> {
    inner: Mutex<Q>,
}

impl<Q: NotificationQueue> SerializedQueue<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            inner: Mutex::new(queue),
        }
    }
}

impl<Q: NotificationQueue> IdentityVerifier for SerializedQueue<Q> {
    fn parse(&self, stream: &[u8]) -> Result<Vec<Notice>> {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        queue.clear();
        let parsed = queue.parse_into_queue(stream);
        // Drain even on failure so nothing leaks into the next request.
        let notices = queue.drain();
        parsed.map(|()| notices)
    }

    fn credential(&self, said: &str) -> Option<Credential> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .credential(said)
    }
}
