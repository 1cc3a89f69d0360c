//! Document stores for creation records.
//!
//! [`MemoryDocumentStore`] keeps documents in a shared map; [`FileDocumentStore`]
//! persists one JSON file per document at `{data_dir}/{collection}/{id}.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::capability::DocumentStore;
use crate::error::StoreError;
use crate::validation::is_valid_id;

/// Longest accepted collection name or document ID.
const MAX_KEY_LEN: usize = 64;

fn check_key(kind: &str, key: &str) -> Result<(), StoreError> {
    if is_valid_id(key, MAX_KEY_LEN) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(format!("{kind} '{key}'")))
    }
}

/// Shallow merge: every top-level field of `patch` replaces the field in `document`.
fn merge_patch(document: &mut Value, patch: Value) -> Result<(), StoreError> {
    let Value::Object(fields) = patch else {
        return Err(StoreError::InvalidPatch);
    };
    let Value::Object(target) = document else {
        return Err(StoreError::InvalidPatch);
    };
    for (key, value) in fields {
        target.insert(key, value);
    }
    Ok(())
}

fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}

type Collections = HashMap<String, HashMap<String, Value>>;

/// In-memory document store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        collections.get(collection).map_or(0, HashMap::len)
    }

    /// Returns true if `collection` holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, document: Value) -> Result<String, StoreError> {
        check_key("collection", collection)?;
        let id = new_document_id();
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_patch(document, patch)
    }
}

/// Document store persisting JSON files below a data directory.
#[derive(Debug)]
pub struct FileDocumentStore {
    data_dir: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Create a store rooted at `data_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        check_key("collection", collection)?;
        check_key("document id", id)?;
        Ok(self.data_dir.join(collection).join(format!("{id}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, document: &Value) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(document)?;
        let temp = path.with_extension("json.tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn create(&self, collection: &str, document: Value) -> Result<String, StoreError> {
        let id = new_document_id();
        let path = self.document_path(collection, &id)?;
        let _guard = self.write_lock.lock().await;
        self.write(&path, &document).await?;
        debug!(collection, id = %id, "Created document");
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.document_path(collection, id)?;
        self.read(&path).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let path = self.document_path(collection, id)?;
        let _guard = self.write_lock.lock().await;
        let mut document = self
            .read(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge_patch(&mut document, patch)?;
        self.write(&path, &document).await?;
        debug!(collection, id, "Updated document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_create_get_update() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("creations", json!({ "title": "Fox", "isPublic": false }))
            .await
            .expect("create");
        assert_eq!(store.len("creations"), 1);

        store
            .update("creations", &id, json!({ "isPublic": true }))
            .await
            .expect("update");
        let doc = store.get("creations", &id).await.expect("get").expect("exists");
        assert_eq!(doc, json!({ "title": "Fox", "isPublic": true }));

        assert!(store.get("creations", "missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_memory_update_missing_or_bad_patch() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.update("creations", "nope", json!({})).await,
            Err(StoreError::NotFound { .. })
        ));

        let id = store.create("creations", json!({})).await.expect("create");
        assert!(matches!(
            store.update("creations", &id, json!([1, 2])).await,
            Err(StoreError::InvalidPatch)
        ));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = {
            let store = FileDocumentStore::new(dir.path()).expect("store");
            store
                .create("creations", json!({ "title": "Harbor", "storagePaths": { "original": "a" } }))
                .await
                .expect("create")
        };
        assert!(dir.path().join("creations").join(format!("{id}.json")).exists());

        let store = FileDocumentStore::new(dir.path()).expect("store");
        store
            .update(
                "creations",
                &id,
                json!({ "storagePaths": { "original": "a", "upscaled": "b" } }),
            )
            .await
            .expect("update");
        let doc = store.get("creations", &id).await.expect("get").expect("exists");
        assert_eq!(doc["title"], "Harbor");
        assert_eq!(doc["storagePaths"]["upscaled"], "b");
    }

    #[tokio::test]
    async fn test_file_store_rejects_unsafe_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path()).expect("store");
        assert!(matches!(
            store.get("creations", "../secrets").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.create("../etc", json!({})).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.get("creations", "absent").await.expect("get").is_none());
    }
}
