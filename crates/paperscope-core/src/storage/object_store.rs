use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One logical object in the store (one issue on the tracker side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl StoredObject {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            data,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub(crate) fn replace_data(&mut self, data: Value) {
        self.data = data;
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

/// Interface to the issue-tracker backed key/value store.
///
/// Archived objects are no longer returned by `get_object` or `list_keys`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Fails with `ObjectExists` if `key` is already live.
    async fn create_object(&self, key: &str, data: Value) -> Result<StoredObject>;

    /// Fails with `ObjectNotFound` if `key` is not live.
    async fn update_object(&self, key: &str, data: Value) -> Result<StoredObject>;

    /// Fails with `ObjectNotFound` if `key` is not live.
    async fn archive_object(&self, key: &str) -> Result<()>;

    async fn list_keys(&self) -> Result<Vec<String>>;
}
