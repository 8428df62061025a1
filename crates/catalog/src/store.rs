//! Async key-value persistence.

use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Settings and approval-list persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    failing: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails while set, like a browser with storage disabled.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check(&self) -> Result<(), StorageError> {
        if *self.failing.read() {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check()?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check()?;
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("settings").await.unwrap(), None);

        store.put("settings", json!({ "limit": 60 })).await.unwrap();
        assert_eq!(
            store.get("settings").await.unwrap(),
            Some(json!({ "limit": 60 }))
        );

        store.delete("settings").await.unwrap();
        assert!(store.is_empty());
        // Deleting a missing key is fine.
        store.delete("settings").await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(matches!(
            store.put("k", json!(1)).await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.get("k").await.is_err());
    }
}
