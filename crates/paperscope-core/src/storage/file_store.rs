use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{PaperscopeError, Result};
use crate::storage::{ObjectStore, StoredObject};

/// Store backed by one JSON file per object: `{root}/objects/{sha256(key)}.json`.
/// Archiving moves the file to `{root}/archived/`.
pub struct FileStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

fn key_to_filename(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{hex}.json")
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    fn archived_dir(&self) -> PathBuf {
        self.root.join("archived")
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.objects_dir().join(key_to_filename(key))
    }

    async fn read(&self, path: &Path) -> Result<Option<StoredObject>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, object: &StoredObject) -> Result<()> {
        tokio::fs::create_dir_all(self.objects_dir()).await?;
        let path = self.object_path(&object.key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(object)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn get_object(&self, key: &str) -> Result<Option<StoredObject>> {
        self.read(&self.object_path(key)).await
    }

    async fn create_object(&self, key: &str, data: Value) -> Result<StoredObject> {
        let _guard = self.write_lock.lock().await;
        if self.read(&self.object_path(key)).await?.is_some() {
            return Err(PaperscopeError::ObjectExists(key.to_string()));
        }
        let object = StoredObject::new(key, data);
        self.write(&object).await?;
        Ok(object)
    }

    async fn update_object(&self, key: &str, data: Value) -> Result<StoredObject> {
        let _guard = self.write_lock.lock().await;
        let mut object = self
            .read(&self.object_path(key))
            .await?
            .ok_or_else(|| PaperscopeError::ObjectNotFound(key.to_string()))?;
        object.replace_data(data);
        self.write(&object).await?;
        Ok(object)
    }

    async fn archive_object(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.object_path(key);
        if !tokio::fs::try_exists(&path).await? {
            return Err(PaperscopeError::ObjectNotFound(key.to_string()));
        }
        tokio::fs::create_dir_all(self.archived_dir()).await?;
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let target = self
            .archived_dir()
            .join(format!("{stamp}-{}", key_to_filename(key)));
        tokio::fs::rename(&path, &target).await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let dir = self.objects_dir();
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(object)) => keys.push(object.key),
                Ok(None) => {}
                Err(e) => warn!("skipping unreadable object {}: {e}", path.display()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
