//! One-shot setup jobs: seed the category taxonomy, import services through
//! the validation gate, expand the per-sub-service catalog and fill the
//! showcase collections.

use crate::batch_writer::BatchWriter;
use crate::catalog::{load_categories, Highlights, SubServiceCatalog};
use crate::config::CollectionNames;
use crate::error::Result;
use crate::storage::{DocumentStore, WriteOp};
use crate::types::{stamp_created, stamp_updated, Category, Service};
use crate::validator::validate;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

/// How `seed_categories` treats categories already in the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeedMode {
    /// Upsert each category, shallow-merging into an existing document
    #[default]
    Merge,
    /// Delete every existing category first, then write the new set
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub written: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.imported + self.rejected + self.failed
    }
}

pub struct Seeder<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a CollectionNames,
    writer: BatchWriter,
}

impl<'a> Seeder<'a> {
    pub fn new(store: &'a dyn DocumentStore, collections: &'a CollectionNames, writer: BatchWriter) -> Self {
        Self {
            store,
            collections,
            writer,
        }
    }

    pub async fn seed_categories(&self, categories: &[Category], mode: SeedMode) -> Result<SeedSummary> {
        let collection = self.collections.categories.as_str();
        let mut summary = SeedSummary::default();

        if mode == SeedMode::Replace {
            let existing: Vec<String> = self
                .store
                .get_all(collection)
                .await?
                .into_iter()
                .map(|doc| doc.id)
                .collect();
            info!("Deleting {} existing categories", existing.len());
            let deleted = self.writer.delete_all(self.store, collection, existing).await;
            summary.deleted = deleted.updated;
            summary.failed += deleted.failed;
        }

        let now = Utc::now();
        let mut ops = Vec::with_capacity(categories.len());
        for category in categories {
            let mut fields = category.to_fields()?;
            fields.remove("id");
            match mode {
                SeedMode::Merge => stamp_updated(&mut fields, now),
                SeedMode::Replace => stamp_created(&mut fields, now),
            }
            ops.push(WriteOp::Set {
                collection: collection.to_string(),
                id: category.id.clone(),
                fields,
                merge: mode == SeedMode::Merge,
            });
        }

        let written = self.writer.apply_ops(self.store, ops).await;
        summary.written = written.updated;
        summary.failed += written.failed;
        info!(
            "Seeded {} categories ({} deleted, {} failed)",
            summary.written, summary.deleted, summary.failed
        );
        Ok(summary)
    }

    /// Validates each service against the live categories and adds the valid
    /// ones with fresh counters. Invalid services are skipped, never retried.
    pub async fn import_services(&self, services: Vec<Service>) -> Result<ImportSummary> {
        let categories = load_categories(self.store, &self.collections.categories).await?;
        if categories.is_empty() {
            warn!(
                "No categories in '{}'; every service will be rejected",
                self.collections.categories
            );
        }

        let mut summary = ImportSummary::default();
        for mut service in services {
            if let Err(e) = validate(&service, &categories) {
                warn!("Skipping service '{}': {}", service.name, e);
                metrics::counter!("catalog_services_rejected_total").increment(1);
                summary.rejected += 1;
                continue;
            }

            service.reset_counters();
            let mut fields = match service.to_fields() {
                Ok(fields) => fields,
                Err(e) => {
                    error!("Could not encode service '{}': {}", service.name, e);
                    summary.failed += 1;
                    continue;
                }
            };
            stamp_created(&mut fields, Utc::now());

            match self.store.add(&self.collections.services, fields).await {
                Ok(id) => {
                    info!("✅ Imported: {} (ID: {})", service.name, id);
                    summary.imported += 1;
                }
                Err(e) => {
                    error!("❌ Error importing {}: {}", service.name, e);
                    metrics::counter!("catalog_writes_failed_total").increment(1);
                    summary.failed += 1;
                }
            }
        }

        metrics::counter!("catalog_services_imported_total").increment(summary.imported as u64);
        Ok(summary)
    }

    /// Expands the per-sub-service catalog and imports it through the same
    /// validation gate as [`import_services`](Self::import_services).
    pub async fn populate_sub_services(&self, catalogs: &[SubServiceCatalog]) -> Result<ImportSummary> {
        let services: Vec<Service> = catalogs
            .iter()
            .inspect(|catalog| {
                info!(
                    "📂 {}: {} sub-services, {} services",
                    catalog.category_name,
                    catalog.sub_services.len(),
                    catalog.offering_count()
                )
            })
            .flat_map(SubServiceCatalog::expand)
            .collect();
        self.import_services(services).await
    }

    /// Adds the showcase records. These keep their rating and booking
    /// numbers and are not validated.
    pub async fn seed_highlights(&self, highlights: &Highlights) -> SeedSummary {
        let mut summary = SeedSummary::default();
        let sets = [
            (self.collections.featured.as_str(), &highlights.featured),
            (self.collections.popular.as_str(), &highlights.popular),
        ];

        for (collection, services) in sets {
            for service in services {
                let result = match service.to_fields() {
                    Ok(mut fields) => {
                        stamp_created(&mut fields, Utc::now());
                        self.store.add(collection, fields).await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(id) => {
                        info!("Imported to {}: {} (ID: {})", collection, service.name, id);
                        summary.written += 1;
                    }
                    Err(e) => {
                        error!("Error importing {} to {}: {}", service.name, collection, e);
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }
}
