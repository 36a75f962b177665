use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PaperscopeError, Result};
use crate::storage::{ObjectStore, StoredObject};

/// In-process store. Used by tests and as a scratch backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    live: Mutex<HashMap<String, StoredObject>>,
    archived: Mutex<Vec<StoredObject>>,
    calls: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls of any kind.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of successful create/update/archive calls.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn archived_keys(&self) -> Vec<String> {
        self.archived
            .lock()
            .map(|a| a.iter().map(|o| o.key.clone()).collect())
            .unwrap_or_default()
    }

    fn lock_live(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredObject>>> {
        self.live
            .lock()
            .map_err(|_| PaperscopeError::Store("memory store poisoned".into()))
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        self.touch();
        Ok(self.lock_live()?.get(key).cloned())
    }

    async fn create_object(&self, key: &str, data: Value) -> Result<StoredObject> {
        self.touch();
        let mut live = self.lock_live()?;
        if live.contains_key(key) {
            return Err(PaperscopeError::ObjectExists(key.to_string()));
        }
        let object = StoredObject::new(key, data);
        live.insert(key.to_string(), object.clone());
        self.mutated();
        Ok(object)
    }

    async fn update_object(&self, key: &str, data: Value) -> Result<StoredObject> {
        self.touch();
        let mut live = self.lock_live()?;
        let object = live
            .get_mut(key)
            .ok_or_else(|| PaperscopeError::ObjectNotFound(key.to_string()))?;
        object.replace_data(data);
        self.mutated();
        Ok(object.clone())
    }

    async fn archive_object(&self, key: &str) -> Result<()> {
        self.touch();
        let object = self
            .lock_live()?
            .remove(key)
            .ok_or_else(|| PaperscopeError::ObjectNotFound(key.to_string()))?;
        if let Ok(mut archived) = self.archived.lock() {
            archived.push(object);
        }
        self.mutated();
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        self.touch();
        let mut keys: Vec<String> = self.lock_live()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_update() {
        let store = MemoryStore::new();
        store.create_object("paper:a.1", json!({"title": "A"})).await.unwrap();
        assert!(matches!(
            store.create_object("paper:a.1", json!({})).await,
            Err(PaperscopeError::ObjectExists(_))
        ));

        let updated = store.update_object("paper:a.1", json!({"title": "B"})).await.unwrap();
        assert_eq!(updated.version, 2);
        let got = store.get_object("paper:a.1").await.unwrap().unwrap();
        assert_eq!(got.data["title"], "B");
        assert_eq!(store.mutation_count(), 2);
    }

    #[tokio::test]
    async fn test_archive_hides_object() {
        let store = MemoryStore::new();
        store.create_object("paper:a.1", json!({})).await.unwrap();
        store.archive_object("paper:a.1").await.unwrap();

        assert!(store.get_object("paper:a.1").await.unwrap().is_none());
        assert!(store.list_keys().await.unwrap().is_empty());
        assert_eq!(store.archived_keys(), vec!["paper:a.1"]);
        assert!(matches!(
            store.archive_object("paper:a.1").await,
            Err(PaperscopeError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = MemoryStore::new();
        assert!(store.update_object("nope", json!({})).await.is_err());
        assert_eq!(store.mutation_count(), 0);
        assert_eq!(store.call_count(), 1);
    }
}
