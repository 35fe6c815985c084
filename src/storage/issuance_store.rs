// src/storage/issuance_store.rs
//! Durable "seen/verified-at" bookkeeping keyed by credential SAID.
//!
//! One entry per SAID, last write wins. Nothing here ever deletes entries.

use crate::error::Result;
use crate::utils::serialization::{deserialize, serialize_pretty};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Key-value surface for issuance records.
pub trait IssuanceStore: Send + Sync {
    /// Records `at` for `said`, replacing any earlier timestamp.
    fn put(&self, said: &str, at: DateTime<Utc>) -> Result<()>;

    fn get(&self, said: &str) -> Option<DateTime<Utc>>;

    /// Number of distinct SAIDs recorded.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Issuance records kept in a JSON object on disk.
///
/// The whole map is rewritten on every `put`, to a temporary file that is
/// then renamed over the original, so readers never see a torn file.
#[derive(Debug)]
pub struct FileIssuanceStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, String>>,
}

impl FileIssuanceStore {
    /// Opens the store at `path`, loading existing records if the file
    /// exists and creating parent directories otherwise.
    ///
    /// # Errors
    /// `IoFault` if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            deserialize(&fs::read_to_string(&path)?)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };
        debug!("opened issuance store {} ({} records)", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn persist(&self, records: &BTreeMap<String, String>) -> Result<()> {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, serialize_pretty(records)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl IssuanceStore for FileIssuanceStore {
    fn put(&self, said: &str, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        // Memory only changes once the file holds the new entry.
        let mut updated = records.clone();
        updated.insert(said.to_string(), at.to_rfc3339());
        self.persist(&updated)?;
        *records = updated;
        Ok(())
    }

    fn get(&self, said: &str) -> Option<DateTime<Utc>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .get(said)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Volatile store for tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryIssuanceStore {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryIssuanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IssuanceStore for MemoryIssuanceStore {
    fn put(&self, said: &str, at: DateTime<Utc>) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(said.to_string(), at);
        Ok(())
    }

    fn get(&self, said: &str) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(said)
            .copied()
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
