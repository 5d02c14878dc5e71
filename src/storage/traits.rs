use crate::constants::MAX_BATCH_WRITES;
use crate::error::Result;
use crate::types::{Document, Fields};
use async_trait::async_trait;
use serde_json::Value;

/// A single write queued in a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace a document; `merge` shallow-merges into an existing one
    Set {
        collection: String,
        id: String,
        fields: Fields,
        merge: bool,
    },
    /// Patch fields of an existing document; fails if it does not exist
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn document_id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// Writes committed together as one atomic unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &str, id: &str, fields: Fields, merge: bool) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
            merge,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Collection-scoped access to the marketplace document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full collection scan, no pagination.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Documents whose `field` equals `value`.
    async fn get_where(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        let docs = self.get_all(collection).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    /// Creates a document under a generated id and returns the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String>;

    /// Creates or replaces a document; with `merge` the fields are
    /// shallow-merged into the existing document instead.
    async fn set(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> Result<()>;

    /// Applies every operation of the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Largest batch [`commit`](DocumentStore::commit) accepts.
    fn max_batch_writes(&self) -> usize {
        MAX_BATCH_WRITES
    }
}
