use super::traits::{DocumentStore, WriteBatch, WriteOp};
use crate::constants::MAX_BATCH_WRITES;
use crate::error::{CatalogError, Result};
use crate::types::{Document, Fields};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// collection -> document id -> fields
pub type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

/// In-memory store implementation for development/testing
#[derive(Clone)]
pub struct InMemoryStore {
    collections: Arc<Mutex<Collections>>,
    max_batch_writes: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(Collections::new())
    }

    pub fn from_snapshot(collections: Collections) -> Self {
        Self {
            collections: Arc::new(Mutex::new(collections)),
            max_batch_writes: MAX_BATCH_WRITES,
        }
    }

    pub fn with_max_batch_writes(mut self, max_batch_writes: usize) -> Self {
        self.max_batch_writes = max_batch_writes;
        self
    }

    /// Single document lookup, mostly for assertions.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>> {
        Ok(self
            .lock()?
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    /// Applies `ops` to a staged copy and hands it to `before_swap`; the
    /// copy replaces the live contents only if both succeed.
    pub(crate) fn apply_staged(
        &self,
        ops: Vec<WriteOp>,
        before_swap: impl FnOnce(&Collections) -> Result<()>,
    ) -> Result<()> {
        if ops.len() > self.max_batch_writes {
            return Err(CatalogError::write(format!(
                "batch of {} writes exceeds the store limit of {}",
                ops.len(),
                self.max_batch_writes
            )));
        }

        let mut collections = self.lock()?;
        let mut staged = collections.clone();
        for op in ops {
            apply_op(&mut staged, op)?;
        }
        before_swap(&staged)?;
        *collections = staged;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|_| CatalogError::store("in-memory store lock poisoned"))
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CatalogError::write("document id must not be empty"));
    }
    Ok(())
}

fn write_set(collections: &mut Collections, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
    require_id(id)?;
    let docs = collections.entry(collection.to_string()).or_default();
    if merge {
        if let Some(existing) = docs.get_mut(id) {
            existing.extend(fields);
            return Ok(());
        }
    }
    docs.insert(id.to_string(), fields);
    Ok(())
}

fn apply_op(collections: &mut Collections, op: WriteOp) -> Result<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            fields,
            merge,
        } => write_set(collections, &collection, &id, fields, merge),
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            require_id(&id)?;
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or_else(|| CatalogError::write(format!("no document to update: {}/{}", collection, id)))?;
            doc.extend(fields);
            Ok(())
        }
        WriteOp::Delete { collection, id } => {
            require_id(&id)?;
            if let Some(docs) = collections.get_mut(&collection) {
                docs.remove(&id);
            }
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.lock()?;
        write_set(&mut collections, collection, &id, fields, false)?;

        debug!("Added document {}/{}", collection, id);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()> {
        let mut collections = self.lock()?;
        write_set(&mut collections, collection, id, fields, merge)?;

        debug!("Set document {}/{} (merge: {})", collection, id, merge);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let size = batch.len();
        self.apply_staged(batch.into_ops(), |_| Ok(()))?;

        debug!("Committed batch of {} writes", size);
        Ok(())
    }

    fn max_batch_writes(&self) -> usize {
        self.max_batch_writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn set_with_merge_keeps_untouched_fields() {
        let store = InMemoryStore::new();
        store
            .set("serviceCategories", "cleaning", fields(json!({"name": "Cleaning", "icon": "cleaning_services"})), false)
            .await
            .unwrap();
        store
            .set("serviceCategories", "cleaning", fields(json!({"name": "Cleaning & Housekeeping"})), true)
            .await
            .unwrap();

        let doc = store.get("serviceCategories", "cleaning").unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Cleaning & Housekeeping")));
        assert_eq!(doc.get("icon"), Some(&json!("cleaning_services")));
    }

    #[tokio::test]
    async fn get_where_filters_on_one_field() {
        let store = InMemoryStore::new();
        store.add("services", fields(json!({"categoryId": "plumbing"}))).await.unwrap();
        store.add("services", fields(json!({"categoryId": "beauty"}))).await.unwrap();

        let plumbing = store
            .get_where("services", "categoryId", &json!("plumbing"))
            .await
            .unwrap();
        assert_eq!(plumbing.len(), 1);
    }

    #[tokio::test]
    async fn failing_batch_leaves_store_untouched() {
        let store = InMemoryStore::new();
        store.set("services", "a", fields(json!({"subService": "Old"})), false).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.update("services", "a", fields(json!({"subService": "New"})));
        batch.update("services", "missing", fields(json!({"subService": "New"})));
        assert!(store.commit(batch).await.is_err());

        let doc = store.get("services", "a").unwrap().unwrap();
        assert_eq!(doc.get("subService"), Some(&json!("Old")));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let store = InMemoryStore::new().with_max_batch_writes(2);
        let mut batch = WriteBatch::new();
        for id in ["a", "b", "c"] {
            batch.set("services", id, Fields::new(), false);
        }
        assert!(store.commit(batch).await.is_err());
        assert!(store.get_all("services").await.unwrap().is_empty());
    }
}
