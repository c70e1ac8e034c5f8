//! In-memory storage backend for tests and ephemeral runs.

use crate::error::AppResult;
use crate::store::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keeps collection snapshots in a map; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    collections: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self, collection: &str) -> AppResult<Option<String>> {
        Ok(self.collections.lock().unwrap().get(collection).cloned())
    }

    async fn save(&self, collection: &str, payload: &str) -> AppResult<()> {
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string(), payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let backend = MemoryBackend::new();
        tokio_test::block_on(async {
            assert_eq!(backend.load("users").await.unwrap(), None);
            backend.save("users", "{}").await.unwrap();
            assert_eq!(backend.load("users").await.unwrap().as_deref(), Some("{}"));
        });
    }
}
