// src/services/issuance.rs
//! Bookkeeping for credentials that resolved successfully.

use crate::error::Result;
use crate::storage::issuance_store::IssuanceStore;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

/// Marks resolved credentials as seen, last write wins.
#[derive(Clone)]
pub struct IssuanceRecorder {
    store: Arc<dyn IssuanceStore>,
}

impl IssuanceRecorder {
    pub fn new(store: Arc<dyn IssuanceStore>) -> Self {
        Self { store }
    }

    /// Writes (or overwrites) the record for `said`.
    ///
    /// # Errors
    /// `IoFault` if the store cannot persist the entry.
    pub fn record(&self, said: &str, at: DateTime<Utc>) -> Result<()> {
        self.store.put(said, at)?;
        info!("recorded issuance check for {} at {}", said, at.to_rfc3339());
        Ok(())
    }
}
