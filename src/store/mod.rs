//! Durable key-value store.
//!
//! The backend persists each named collection as one serialized document;
//! `Collection<T>` keeps the working copy in memory and flushes explicitly
//! after mutations. A failed flush never corrupts the in-memory copy.

pub mod disk;
pub mod memory;

pub use disk::DiskBackend;
pub use memory::MemoryBackend;

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage backend trait
///
/// Implementations handle durable load/save of whole collections.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load the serialized form of a collection, if present
    async fn load(&self, collection: &str) -> AppResult<Option<String>>;

    /// Durably replace the serialized form of a collection
    async fn save(&self, collection: &str, payload: &str) -> AppResult<()>;
}

/// An in-memory map of records backed by a named durable collection.
pub struct Collection<T> {
    name: &'static str,
    backend: Arc<dyn StorageBackend>,
    entries: RwLock<HashMap<String, T>>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Open a collection, loading any existing snapshot from the backend.
    pub async fn open(name: &'static str, backend: Arc<dyn StorageBackend>) -> AppResult<Self> {
        let entries = match backend.load(name).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map_err(|e| AppError::Storage(format!("corrupt {} collection: {}", name, e)))?,
            None => HashMap::new(),
        };
        Ok(Self {
            name,
            backend,
            entries: RwLock::new(entries),
        })
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: T) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn list(&self) -> Vec<(String, T)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Run a closure against an existing entry under the write lock.
    /// Returns None when the key is absent.
    pub async fn update<R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut entries = self.entries.write().await;
        entries.get_mut(key).map(f)
    }

    /// Run a closure against the stored entry, inserting a default first if
    /// the key is unknown.
    pub async fn update_or_insert<R>(
        &self,
        key: &str,
        default: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_insert_with(default);
        f(entry)
    }

    /// Drop every entry the predicate rejects; returns the removed count.
    pub async fn retain(&self, mut keep: impl FnMut(&str, &T) -> bool) -> u64 {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, v| keep(k, v));
        (before - entries.len()) as u64
    }

    /// Serialize a snapshot of the map and hand it to the backend. The
    /// in-memory map is untouched if serialization or the write fails.
    pub async fn flush(&self) -> AppResult<()> {
        let payload = {
            let entries = self.entries.read().await;
            serde_json::to_string(&*entries)
                .map_err(|e| AppError::Storage(format!("serialize {}: {}", self.name, e)))?
        };
        self.backend.save(self.name, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        count: u32,
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = Arc::new(MemoryBackend::new());
        let collection: Collection<Record> = Collection::open("records", backend).await.unwrap();

        collection.set("a", Record { count: 1 }).await;
        assert_eq!(collection.get("a").await, Some(Record { count: 1 }));
        assert_eq!(collection.len().await, 1);

        assert!(collection.delete("a").await);
        assert!(!collection.delete("a").await);
        assert_eq!(collection.get("a").await, None);
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let collection: Collection<Record> =
                Collection::open("records", Arc::clone(&backend) as Arc<dyn StorageBackend>)
                    .await
                    .unwrap();
            collection.set("a", Record { count: 7 }).await;
            collection.flush().await.unwrap();
        }

        let reopened: Collection<Record> = Collection::open("records", backend).await.unwrap();
        assert_eq!(reopened.get("a").await, Some(Record { count: 7 }));
    }

    #[tokio::test]
    async fn test_unflushed_changes_are_not_durable() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let collection: Collection<Record> =
                Collection::open("records", Arc::clone(&backend) as Arc<dyn StorageBackend>)
                    .await
                    .unwrap();
            collection.set("a", Record { count: 1 }).await;
            // no flush
        }

        let reopened: Collection<Record> = Collection::open("records", backend).await.unwrap();
        assert_eq!(reopened.get("a").await, None);
    }

    #[tokio::test]
    async fn test_update_or_insert() {
        let backend = Arc::new(MemoryBackend::new());
        let collection: Collection<Record> = Collection::open("records", backend).await.unwrap();

        let count = collection
            .update_or_insert("a", || Record { count: 0 }, |r| {
                r.count += 1;
                r.count
            })
            .await;
        assert_eq!(count, 1);

        let count = collection
            .update_or_insert("a", || Record { count: 0 }, |r| {
                r.count += 1;
                r.count
            })
            .await;
        assert_eq!(count, 2);

        assert_eq!(collection.update("missing", |r| r.count).await, None);
    }

    #[tokio::test]
    async fn test_retain_counts_removed() {
        let backend = Arc::new(MemoryBackend::new());
        let collection: Collection<Record> = Collection::open("records", backend).await.unwrap();

        collection.set("keep", Record { count: 10 }).await;
        collection.set("drop", Record { count: 1 }).await;

        let removed = collection.retain(|_, r| r.count >= 5).await;
        assert_eq!(removed, 1);
        assert!(collection.get("keep").await.is_some());
        assert!(collection.get("drop").await.is_none());
    }
}
