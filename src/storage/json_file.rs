use super::in_memory::{Collections, InMemoryStore};
use super::traits::{DocumentStore, WriteBatch, WriteOp};
use crate::error::{CatalogError, Result};
use crate::types::{Document, Fields};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Document store persisted as one JSON snapshot
/// (`{collection: {id: fields}}`), rewritten after every successful write.
pub struct JsonFileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl JsonFileStore {
    /// Opens the snapshot at `path`. A missing file starts an empty store;
    /// an unreadable or malformed one is fatal.
    pub fn open(path: impl AsRef<Path>, max_batch_writes: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let collections: Collections = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                CatalogError::FatalInit(format!("cannot read store file '{}': {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                CatalogError::FatalInit(format!("malformed store file '{}': {}", path.display(), e))
            })?
        } else {
            info!("Store file {} does not exist yet, starting empty", path.display());
            Collections::new()
        };

        Ok(Self {
            path,
            inner: InMemoryStore::from_snapshot(collections).with_max_batch_writes(max_batch_writes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `snapshot` to disk. Runs before the in-memory swap, so a
    /// failed write leaves both copies at the previous state.
    fn persist(&self, snapshot: &Collections) -> Result<()> {
        let body = serde_json::to_string_pretty(snapshot)?;

        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = self.path.with_extension("json.tmp");
        parent
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&tmp, body))
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| CatalogError::write(format!("cannot persist '{}': {}", self.path.display(), e)))?;

        debug!("Persisted store snapshot to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.inner.get_all(collection).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.set(collection, &id, fields, false).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
        let op = WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge,
        };
        self.inner.apply_staged(vec![op], |staged| self.persist(staged))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.inner
            .apply_staged(batch.into_ops(), |staged| self.persist(staged))
    }

    fn max_batch_writes(&self) -> usize {
        self.inner.max_batch_writes()
    }
}
