//! Typed K/V persistence of intent records (`spec.md` §4.1).
//!
//! `MemoryStorage` is the only implementation this crate ships — an
//! `async_std::sync::Mutex`-guarded `BTreeMap`, following the locking idiom
//! `MetastoreClient` uses in `pkg/datastore/src/meta/client.rs`. A real
//! deployment would swap this for a durable K/V engine behind the same
//! trait; that engine's on-disk format is an external collaborator
//! (`spec.md` §1).

use std::collections::BTreeMap;

use common::async_std::sync::Mutex;

use crate::model::IntentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The caller's `expectedVersion` didn't match the currently stored
    /// version (or `expectedVersion == 0` but the key already exists).
    Conflict,
    NotFound,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, name: &str) -> Option<IntentRecord>;

    /// `expectedVersion = 0` means "create only": the call fails with
    /// `Conflict` if a record already exists under `name`.
    async fn set(&self, name: &str, record: IntentRecord, expected_version: u64)
        -> StorageResult<u64>;

    async fn delete(&self, name: &str, expected_version: u64) -> StorageResult<()>;

    /// Snapshot of all records whose name starts with `prefix`, sorted by
    /// name (the `BTreeMap` is already sorted, so this is a cheap range
    /// scan). Simplified relative to the teacher's on-disk sstable iterator
    /// (`pkg/container/src/node/tasks_table.rs`) because no sstable engine
    /// is available to an in-memory store — see `DESIGN.md`.
    async fn list(&self, prefix: &str) -> Vec<IntentRecord>;
}

#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<BTreeMap<String, IntentRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, name: &str) -> Option<IntentRecord> {
        self.records.lock().await.get(name).cloned()
    }

    async fn set(
        &self,
        name: &str,
        record: IntentRecord,
        expected_version: u64,
    ) -> StorageResult<u64> {
        let mut records = self.records.lock().await;

        let current_version = records.get(name).map(|r| r.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(StorageError::Conflict);
        }

        let new_version = record.version;
        records.insert(name.to_string(), record);
        Ok(new_version)
    }

    async fn delete(&self, name: &str, expected_version: u64) -> StorageResult<()> {
        let mut records = self.records.lock().await;

        match records.get(name) {
            None => return Err(StorageError::NotFound),
            Some(existing) if existing.version != expected_version => {
                return Err(StorageError::Conflict)
            }
            Some(_) => {}
        }

        records.remove(name);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Vec<IntentRecord> {
        self.records
            .lock()
            .await
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, record)| record.clone())
            .collect()
    }
}
