use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::{CatalogError, Result};
use crate::storage::{DocumentStore, WriteBatch, WriteOp};
use crate::types::Fields;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// One field update for an existing document
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub id: String,
    pub fields: Fields,
}

impl PendingUpdate {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Counts from one writer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub updated: usize,
    pub failed: usize,
    pub commits: usize,
}

impl WriteSummary {
    pub fn merge(&mut self, other: WriteSummary) {
        self.updated += other.updated;
        self.failed += other.failed;
        self.commits += other.commits;
    }
}

/// Flushes writes to the store in chunks of at most `chunk_size`.
///
/// Each chunk is committed atomically; chunks are independent, so a failed
/// chunk is counted and the writer moves on. Empty chunks are never committed.
#[derive(Debug, Clone, Copy)]
pub struct BatchWriter {
    chunk_size: usize,
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BatchWriter {
    /// Writer for `store`; the chunk size must fit the store's batch limit.
    pub fn for_store(store: &dyn DocumentStore, chunk_size: usize) -> Result<Self> {
        let limit = store.max_batch_writes();
        if chunk_size == 0 || chunk_size > limit {
            return Err(CatalogError::Config(format!(
                "chunk size {} must be between 1 and the store limit of {}",
                chunk_size, limit
            )));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Applies field updates to documents of `collection`.
    pub async fn apply_patches(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
        updates: Vec<PendingUpdate>,
    ) -> WriteSummary {
        let ops = updates.into_iter().map(|update| WriteOp::Update {
            collection: collection.to_string(),
            id: update.id,
            fields: update.fields,
        });
        self.apply_ops(store, ops).await
    }

    /// Deletes the given documents of `collection`.
    pub async fn delete_all(&self, store: &dyn DocumentStore, collection: &str, ids: Vec<String>) -> WriteSummary {
        let ops = ids.into_iter().map(|id| WriteOp::Delete {
            collection: collection.to_string(),
            id,
        });
        self.apply_ops(store, ops).await
    }

    pub async fn apply_ops(
        &self,
        store: &dyn DocumentStore,
        ops: impl IntoIterator<Item = WriteOp>,
    ) -> WriteSummary {
        let mut summary = WriteSummary::default();
        let mut batch = WriteBatch::new();

        for op in ops {
            if let Err(e) = check_op(&op) {
                warn!("Skipping malformed write for '{}': {}", op.document_id(), e);
                metrics::counter!("catalog_writes_failed_total").increment(1);
                summary.failed += 1;
                continue;
            }

            batch.push(op);
            if batch.len() == self.chunk_size {
                self.flush(store, std::mem::take(&mut batch), &mut summary).await;
            }
        }

        if !batch.is_empty() {
            self.flush(store, batch, &mut summary).await;
        }

        summary
    }

    async fn flush(&self, store: &dyn DocumentStore, batch: WriteBatch, summary: &mut WriteSummary) {
        let size = batch.len();
        debug!("Committing batch of {} writes", size);

        match store.commit(batch).await {
            Ok(()) => {
                summary.updated += size;
                summary.commits += 1;
                metrics::counter!("catalog_batches_committed_total").increment(1);
                metrics::counter!("catalog_writes_committed_total").increment(size as u64);
                info!("Committed batch of {} writes ({} so far)", size, summary.updated);
            }
            Err(e) => {
                summary.failed += size;
                metrics::counter!("catalog_writes_failed_total").increment(size as u64);
                error!("Batch of {} writes failed: {}", size, e);
            }
        }
    }
}

fn check_op(op: &WriteOp) -> Result<()> {
    if op.document_id().is_empty() {
        return Err(CatalogError::write("missing document id"));
    }
    if let WriteOp::Update { fields, .. } = op {
        if fields.is_empty() {
            return Err(CatalogError::write("update carries no fields"));
        }
    }
    Ok(())
}
