//! Medication cache: national code → resolved record, persisted after every mutation.

mod json;
mod sqlite;

pub use json::*;
pub use sqlite::*;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::MedicationRecord;

/// Cache store errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unsupported cache format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Background write failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Durable location for the cache, read once and rewritten in full.
pub trait CacheStore: Send {
    /// Read every record in insertion order.
    fn load(&self) -> CacheResult<Vec<MedicationRecord>>;

    /// Overwrite the store with `records`.
    fn save(&self, records: &[MedicationRecord]) -> CacheResult<()>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Non-durable store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MedicationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot.
    pub fn with_records(records: Vec<MedicationRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> CacheResult<Vec<MedicationRecord>> {
        Ok(self.records.lock().map(|r| r.clone()).unwrap_or_default())
    }

    fn save(&self, records: &[MedicationRecord]) -> CacheResult<()> {
        if let Ok(mut stored) = self.records.lock() {
            *stored = records.to_vec();
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

/// Unbounded, never-expiring mapping from national code to record.
///
/// Insertion order is kept; replacing a record keeps its original position.
pub struct MedicationCache {
    store: Arc<Mutex<Box<dyn CacheStore>>>,
    records: Vec<MedicationRecord>,
    index: HashMap<String, usize>,
}

impl MedicationCache {
    /// Load the cache from `store`. An unreadable store starts empty.
    pub fn open(store: Box<dyn CacheStore>) -> Self {
        let records = match store.load() {
            Ok(records) => {
                info!(store = %store.describe(), count = records.len(), "medication cache loaded");
                records
            }
            Err(e) => {
                warn!(
                    store = %store.describe(),
                    error = %e,
                    "unreadable medication cache, starting empty"
                );
                Vec::new()
            }
        };

        let mut cache = Self {
            store: Arc::new(Mutex::new(store)),
            records: Vec::new(),
            index: HashMap::new(),
        };
        for record in records {
            cache.insert(record);
        }
        cache
    }

    /// Cache backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStore::new()))
    }

    pub fn get(&self, code: &str) -> Option<&MedicationRecord> {
        self.index.get(code).map(|&i| &self.records[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Insert or replace a record, then persist the whole cache.
    ///
    /// The in-memory mapping is updated even when persisting fails.
    pub fn put(&mut self, record: MedicationRecord) -> CacheResult<()> {
        debug!(code = %record.code, "caching medication");
        self.insert(record);
        self.save()
    }

    /// [`put`](Self::put) with the store write on the blocking pool.
    pub async fn put_async(&mut self, record: MedicationRecord) -> CacheResult<()> {
        debug!(code = %record.code, "caching medication");
        self.insert(record);
        self.save_async().await
    }

    /// Drop a record so the next resolution goes back to the registry.
    pub fn invalidate(&mut self, code: &str) -> CacheResult<bool> {
        if !self.remove(code) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// [`invalidate`](Self::invalidate) with the store write on the blocking pool.
    pub async fn invalidate_async(&mut self, code: &str) -> CacheResult<bool> {
        if !self.remove(code) {
            return Ok(false);
        }
        self.save_async().await?;
        Ok(true)
    }

    /// Records whose name contains `query`, case-insensitively, in insertion order.
    pub fn search_by_name(&self, query: &str, limit: usize) -> Vec<&MedicationRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[MedicationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the full mapping to the store.
    pub fn save(&self) -> CacheResult<()> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.save(&self.records)
    }

    /// Write a snapshot of the mapping without blocking the async runtime.
    pub async fn save_async(&self) -> CacheResult<()> {
        let store = Arc::clone(&self.store);
        let records = self.records.clone();
        tokio::task::spawn_blocking(move || {
            let store = store.lock().unwrap_or_else(PoisonError::into_inner);
            store.save(&records)
        })
        .await?
    }

    fn remove(&mut self, code: &str) -> bool {
        let Some(pos) = self.index.remove(code) else {
            return false;
        };
        self.records.remove(pos);
        self.reindex();
        true
    }

    fn insert(&mut self, record: MedicationRecord) {
        match self.index.get(&record.code) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.code.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.code.clone(), i))
            .collect();
    }
}
