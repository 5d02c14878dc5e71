//! Read-only audit of how services are distributed over categories.

use crate::catalog::load_category_list;
use crate::error::Result;
use crate::storage::DocumentStore;
use crate::types::{Category, Document, ServiceRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A service whose `categoryId` is missing or unknown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidService {
    pub id: String,
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub sub_service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub id: String,
    pub name: String,
    pub total_services: usize,
    pub declared: Vec<String>,
    pub used: BTreeSet<String>,
    /// Declared but no service uses it
    pub unused: Vec<String>,
    /// Used by a service but not declared
    pub undeclared: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub valid_services: usize,
    pub invalid_services: usize,
    pub success_rate: Option<f64>,
    pub invalid: Vec<InvalidService>,
    pub categories: Vec<CategoryStats>,
}

impl DistributionSummary {
    pub fn stats_for(&self, category_id: &str) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}

/// Partitions `services` into valid and invalid and computes per-category
/// sub-category usage.
pub fn summarize(services: &[Document], categories: &[Category]) -> DistributionSummary {
    let known: BTreeSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
    let mut per_category: BTreeMap<&str, (usize, BTreeSet<String>)> = BTreeMap::new();
    let mut invalid = Vec::new();

    let records: Vec<ServiceRecord> = services.iter().map(ServiceRecord::from_document).collect();
    for record in &records {
        match record.category_id.as_deref().filter(|id| known.contains(id)) {
            Some(category_id) => {
                let entry = per_category.entry(category_id).or_default();
                entry.0 += 1;
                if let Some(sub) = &record.sub_service {
                    entry.1.insert(sub.clone());
                }
            }
            None => invalid.push(InvalidService {
                id: record.id.clone(),
                name: record.name.clone(),
                category_id: record.category_id.clone(),
                sub_service: record.sub_service.clone(),
            }),
        }
    }

    let categories = categories
        .iter()
        .map(|category| {
            let (total_services, used) = per_category.remove(category.id.as_str()).unwrap_or_default();
            let unused = category
                .sub_categories
                .iter()
                .filter(|sub| !used.contains(*sub))
                .cloned()
                .collect();
            let undeclared = used.iter().filter(|sub| !category.declares(sub)).cloned().collect();
            CategoryStats {
                id: category.id.clone(),
                name: category.name.clone(),
                total_services,
                declared: category.sub_categories.clone(),
                used,
                unused,
                undeclared,
            }
        })
        .collect();

    let valid_services = records.len() - invalid.len();
    let success_rate = if records.is_empty() {
        None
    } else {
        Some(valid_services as f64 / records.len() as f64 * 100.0)
    };

    DistributionSummary {
        valid_services,
        invalid_services: invalid.len(),
        success_rate,
        invalid,
        categories,
    }
}

/// Re-reads both collections and summarizes them.
pub async fn report(
    store: &dyn DocumentStore,
    services_collection: &str,
    categories_collection: &str,
) -> Result<DistributionSummary> {
    let services = store.get_all(services_collection).await?;
    let categories = load_category_list(store, categories_collection).await?;
    Ok(summarize(&services, &categories))
}

fn preview(items: &[String], limit: usize) -> String {
    let mut shown = items.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > limit {
        shown.push_str("...");
    }
    shown
}

impl fmt::Display for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 VERIFICATION REPORT")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "✅ Valid services: {}", self.valid_services)?;
        writeln!(f, "❌ Invalid services: {}", self.invalid_services)?;
        if let Some(rate) = self.success_rate {
            writeln!(f, "📈 Success rate: {:.1}%", rate)?;
        }

        writeln!(f, "\n📋 Category Distribution:")?;
        for stats in &self.categories {
            writeln!(
                f,
                "  {} ({}): {} services, {} of {} sub-services used",
                stats.name,
                stats.id,
                stats.total_services,
                stats.used.len(),
                stats.declared.len()
            )?;
            if !stats.unused.is_empty() {
                writeln!(f, "    ⚠️  Unused subCategories: {}", preview(&stats.unused, 3))?;
            }
            if !stats.undeclared.is_empty() {
                writeln!(f, "    ⚠️  Undefined subServices: {}", preview(&stats.undeclared, 3))?;
            }
        }

        if !self.invalid.is_empty() {
            writeln!(f, "\n⚠️  Services with invalid categoryIds:")?;
            for service in self.invalid.iter().take(5) {
                writeln!(
                    f,
                    "  - {} (categoryId: {})",
                    service.name.as_deref().unwrap_or("<unnamed>"),
                    service.category_id.as_deref().unwrap_or("<missing>")
                )?;
            }
            if self.invalid.len() > 5 {
                writeln!(f, "  ... and {} more", self.invalid.len() - 5)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fields;
    use serde_json::{json, Value};

    fn service(id: &str, value: Value) -> Document {
        match value {
            Value::Object(fields) => Document::new(id, fields),
            _ => unreachable!(),
        }
    }

    fn plumbing() -> Category {
        Category {
            id: "plumbing".into(),
            name: "Plumbing & Water Services".into(),
            description: None,
            icon: None,
            color: None,
            sub_categories: vec![
                "Leak Detection & Repair".into(),
                "Drain Unclogging".into(),
                "Emergency Plumbing".into(),
            ],
            search_keywords: vec![],
            is_featured: true,
            is_popular: true,
            extra: Fields::new(),
        }
    }

    #[test]
    fn partitions_and_diffs_sub_categories() {
        let services = vec![
            service("1", json!({"name": "Emergency Leak Repair", "categoryId": "plumbing", "subService": "Leak Detection & Repair"})),
            service("2", json!({"name": "Pipe Leak Detection", "categoryId": "plumbing", "subService": "Leak Detection"})),
            service("3", json!({"name": "Mystery", "categoryId": "unknown-id"})),
            service("4", json!({"name": "No category"})),
        ];

        let summary = summarize(&services, &[plumbing()]);

        assert_eq!(summary.valid_services, 2);
        assert_eq!(summary.invalid_services, 2);
        assert_eq!(summary.success_rate, Some(50.0));

        let stats = summary.stats_for("plumbing").unwrap();
        assert_eq!(stats.total_services, 2);
        assert_eq!(stats.unused, vec!["Drain Unclogging", "Emergency Plumbing"]);
        assert_eq!(stats.undeclared, vec!["Leak Detection"]);
    }

    #[test]
    fn empty_store_has_no_success_rate() {
        let summary = summarize(&[], &[plumbing()]);
        assert_eq!(summary.success_rate, None);
        assert_eq!(summary.stats_for("plumbing").unwrap().unused.len(), 3);
        assert!(summary.to_string().contains("Invalid services: 0"));
    }
}
