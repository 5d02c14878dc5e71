use crate::batch_writer::{BatchWriter, PendingUpdate, WriteSummary};
use crate::catalog::load_category_list;
use crate::classifier::Classifier;
use crate::config::CollectionNames;
use crate::error::Result;
use crate::reconciler::{reconcile, ChangeType, FieldChanged};
use crate::storage::DocumentStore;
use crate::types::ServiceRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One field change made (or proposed, on a dry run) during a reconcile run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub run_id: Uuid,
    pub service_id: String,
    pub service_name: String,
    pub change_type: ChangeType,
    pub field_changed: FieldChanged,
    pub from: Option<String>,
    pub to: String,
}

impl ChangeRecord {
    pub fn change_log(&self) -> String {
        format!(
            "{:?} {}: {} -> {}",
            self.change_type,
            self.field_changed,
            self.from.as_deref().unwrap_or("<none>"),
            self.to
        )
    }
}

/// Result of a complete reconcile run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub scanned: usize,
    pub patched: usize,
    pub unchanged: usize,
    pub write: WriteSummary,
    pub changes: Vec<ChangeRecord>,
}

/// Scans every service, computes its patch and writes the non-empty ones.
pub struct ReconcileRun {
    store: Arc<dyn DocumentStore>,
    collections: CollectionNames,
    writer: BatchWriter,
    dry_run: bool,
}

impl fmt::Debug for ReconcileRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileRun")
            .field("store", &"<Arc<dyn DocumentStore>>")
            .field("collections", &self.collections)
            .field("writer", &self.writer)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ReconcileRun {
    pub fn new(store: Arc<dyn DocumentStore>, collections: CollectionNames, writer: BatchWriter) -> Self {
        Self {
            store,
            collections,
            writer,
            dry_run: false,
        }
    }

    /// Compute and log patches without writing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Valid category ids: the live categories, or the taxonomy's declared
    /// ids when the store has none.
    async fn valid_category_ids(&self, classifier: &Classifier<'_>) -> Result<BTreeSet<String>> {
        let live = load_category_list(self.store.as_ref(), &self.collections.categories).await?;
        if live.is_empty() {
            warn!(
                "No categories in '{}', falling back to the taxonomy's category list",
                self.collections.categories
            );
            return Ok(classifier.taxonomy().categories.iter().cloned().collect());
        }
        Ok(live.into_iter().map(|c| c.id).collect())
    }

    #[instrument(skip(self, classifier), fields(dry_run = self.dry_run))]
    pub async fn run(&self, classifier: &Classifier<'_>) -> Result<ReconcileOutcome> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("🔧 Starting reconcile run {}", run_id);

        let valid_ids = self.valid_category_ids(classifier).await?;
        let services = self.store.get_all(&self.collections.services).await?;
        info!("📊 Found {} services to check", services.len());

        let now = Utc::now();
        let mut updates = Vec::new();
        let mut changes = Vec::new();
        let mut unchanged = 0;

        for doc in &services {
            let record = ServiceRecord::from_document(doc);
            let result = reconcile(&record, &valid_ids, classifier);

            if result.is_noop() {
                debug!("No change for {} ({})", record.display_name(), record.id);
                unchanged += 1;
                continue;
            }

            for change in result.changes {
                let change = ChangeRecord {
                    run_id,
                    service_id: record.id.clone(),
                    service_name: record.display_name().to_string(),
                    change_type: change.change_type,
                    field_changed: change.field,
                    from: change.from,
                    to: change.to,
                };
                info!("✏️  {}: {}", change.service_name, change.change_log());
                changes.push(change);
            }
            updates.push(PendingUpdate::new(record.id.clone(), result.patch.into_fields(now)));
        }

        let patched = updates.len();
        metrics::counter!("catalog_patches_computed_total").increment(patched as u64);

        let write = if self.dry_run || updates.is_empty() {
            if self.dry_run {
                info!("Dry run: {} patches not written", patched);
            }
            WriteSummary::default()
        } else {
            self.writer
                .apply_patches(self.store.as_ref(), &self.collections.services, updates)
                .await
        };

        info!(
            "🏁 Reconcile run {} finished: {} scanned, {} patched, {} unchanged, {} written, {} failed",
            run_id,
            services.len(),
            patched,
            unchanged,
            write.updated,
            write.failed
        );

        Ok(ReconcileOutcome {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            scanned: services.len(),
            patched,
            unchanged,
            write,
            changes,
        })
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🔧 RECONCILE RUN {}", self.run_id)?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "📊 Services scanned: {}", self.scanned)?;
        writeln!(f, "✏️  Services needing changes: {}", self.patched)?;
        writeln!(f, "✅ Already consistent: {}", self.unchanged)?;
        if self.dry_run {
            writeln!(f, "🔍 Dry run: nothing written")?;
        } else {
            writeln!(
                f,
                "💾 Written: {} in {} batches, failed: {}",
                self.write.updated, self.write.commits, self.write.failed
            )?;
        }

        let remapped = self
            .changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Remapped)
            .count();
        writeln!(
            f,
            "   {} remapped, {} inferred",
            remapped,
            self.changes.len() - remapped
        )?;
        Ok(())
    }
}
