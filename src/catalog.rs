//! Catalog Loader: the seed data shipped with the tool and the live category
//! set read back from the store.
//!
//! Every seed set is embedded JSON under `data/`; any of them can be swapped
//! for an external file with the same shape.

use crate::constants::{DEFAULT_CURRENCY, DEFAULT_SERVICE_LOCATION};
use crate::error::{CatalogError, Result};
use crate::storage::DocumentStore;
use crate::types::{Category, CategoryIndex, Fields, PricingType, Service};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const CATEGORIES_JSON: &str = include_str!("../data/categories.json");
const SERVICES_JSON: &str = include_str!("../data/services.json");
const SUB_SERVICES_JSON: &str = include_str!("../data/sub_services.json");
const HIGHLIGHTS_JSON: &str = include_str!("../data/highlights.json");

/// Price band of a catalog offering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// One service offered under a sub-service, before it is tied to a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubServiceOffering {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub pricing_type: PricingType,
    #[serde(default)]
    pub currency: Option<String>,
    /// Hours
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubServiceGroup {
    pub name: String,
    pub services: Vec<SubServiceOffering>,
}

/// Per-sub-service service catalog of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubServiceCatalog {
    pub category_id: String,
    pub category_name: String,
    pub sub_services: Vec<SubServiceGroup>,
}

impl SubServiceCatalog {
    pub fn offering_count(&self) -> usize {
        self.sub_services.iter().map(|group| group.services.len()).sum()
    }

    /// Turns every offering into a full service record of this category.
    pub fn expand(&self) -> Vec<Service> {
        self.sub_services
            .iter()
            .flat_map(|group| {
                group
                    .services
                    .iter()
                    .map(move |offering| self.expand_offering(&group.name, offering))
            })
            .collect()
    }

    fn expand_offering(&self, sub_service: &str, offering: &SubServiceOffering) -> Service {
        let mut extra = offering.extra.clone();
        if let Some(duration) = offering.duration {
            extra.insert("duration".into(), json!(duration));
        }
        if let Some(range) = offering.price_range {
            extra.insert("priceRange".into(), json!({ "min": range.min, "max": range.max }));
        }
        extra.insert("available".into(), Value::Bool(true));
        extra.insert("location".into(), json!(DEFAULT_SERVICE_LOCATION));
        extra.insert("tags".into(), json!([self.category_id, sub_service_tag(sub_service)]));
        extra.insert(
            "bookingSettings".into(),
            json!({
                "advanceBooking": 24,
                "cancellationPolicy": "24 hours",
                "instantBooking": true
            }),
        );

        Service {
            name: offering.name.clone(),
            description: offering.description.clone(),
            category_id: self.category_id.clone(),
            category_name: Some(self.category_name.clone()),
            sub_service: Some(sub_service.to_string()),
            price: offering.price,
            price_max: offering.price_range.map(|range| range.max),
            currency: offering
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            pricing_type: offering.pricing_type,
            rating: 0.0,
            review_count: 0,
            booking_count: 0,
            features: offering.features.clone(),
            images: offering.images.clone(),
            image: offering.images.first().cloned(),
            provider_id: None,
            is_featured: false,
            is_popular: false,
            active: true,
            extra,
        }
    }
}

/// `"Carpet & Rug Cleaning"` -> `"carpet_&_rug_cleaning"`
fn sub_service_tag(sub_service: &str) -> String {
    sub_service
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Records for the featured and popular showcase collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    #[serde(default)]
    pub featured: Vec<Service>,
    #[serde(default)]
    pub popular: Vec<Service>,
}

fn parse_seed<T: DeserializeOwned>(file: Option<&Path>, builtin: &str) -> Result<T> {
    match file {
        Some(path) => {
            debug!("Reading seed data from {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| {
                CatalogError::Config(format!("Failed to read seed file '{}': {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                CatalogError::Config(format!("Invalid seed file '{}': {}", path.display(), e))
            })
        }
        None => Ok(serde_json::from_str(builtin)?),
    }
}

/// The category taxonomy to seed, built-in unless `file` is given.
pub fn seed_categories(file: Option<&Path>) -> Result<Vec<Category>> {
    let categories: Vec<Category> = parse_seed(file, CATEGORIES_JSON)?;
    if let Some(missing) = categories.iter().find(|c| c.id.is_empty()) {
        return Err(CatalogError::Config(format!(
            "category '{}' has no id",
            missing.name
        )));
    }
    Ok(categories)
}

pub fn seed_services(file: Option<&Path>) -> Result<Vec<Service>> {
    parse_seed(file, SERVICES_JSON)
}

pub fn seed_sub_services(file: Option<&Path>) -> Result<Vec<SubServiceCatalog>> {
    parse_seed(file, SUB_SERVICES_JSON)
}

pub fn seed_highlights(file: Option<&Path>) -> Result<Highlights> {
    parse_seed(file, HIGHLIGHTS_JSON)
}

/// Categories currently in the store, in store order. Documents that do not
/// parse as a category are logged and skipped.
pub async fn load_category_list(store: &dyn DocumentStore, collection: &str) -> Result<Vec<Category>> {
    let docs = store.get_all(collection).await?;
    let mut categories = Vec::with_capacity(docs.len());
    for doc in &docs {
        match Category::from_document(doc) {
            Ok(category) => categories.push(category),
            Err(e) => warn!("Skipping malformed category '{}': {}", doc.id, e),
        }
    }
    Ok(categories)
}

/// Live categories keyed by id.
pub async fn load_categories(store: &dyn DocumentStore, collection: &str) -> Result<CategoryIndex> {
    let categories = load_category_list(store, collection).await?;
    Ok(categories.into_iter().map(|c| (c.id.clone(), c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use crate::taxonomy::Taxonomy;
    use crate::validator::validate;

    fn builtin_index() -> CategoryIndex {
        seed_categories(None)
            .unwrap()
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect()
    }

    #[test]
    fn builtin_categories_match_the_taxonomy() {
        let categories = seed_categories(None).unwrap();
        let ids: Vec<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
        for id in &Taxonomy::builtin().categories {
            assert!(ids.contains(&id.as_str()), "{id}");
        }
        Taxonomy::builtin().validate(Some(&builtin_index())).unwrap();
    }

    #[test]
    fn builtin_seed_services_pass_validation() {
        let index = builtin_index();
        for service in seed_services(None).unwrap() {
            validate(&service, &index).unwrap();
        }
        for catalog in seed_sub_services(None).unwrap() {
            for service in catalog.expand() {
                validate(&service, &index).unwrap();
            }
        }
    }

    #[test]
    fn expansion_fills_category_and_booking_defaults() {
        let catalog = seed_sub_services(None)
            .unwrap()
            .into_iter()
            .find(|c| c.category_id == "cleaning")
            .unwrap();
        let services = catalog.expand();
        assert_eq!(services.len(), catalog.offering_count());

        let steam = services.iter().find(|s| s.name == "Steam Carpet Cleaning").unwrap();
        assert_eq!(steam.sub_service.as_deref(), Some("Carpet & Rug Cleaning"));
        assert_eq!(steam.category_name.as_deref(), Some("Cleaning & Housekeeping"));
        assert_eq!(steam.price_max, Some(4500.0));
        assert_eq!(steam.extra["tags"], json!(["cleaning", "carpet_&_rug_cleaning"]));
        assert_eq!(steam.extra["location"], json!("Nairobi, Kenya"));
        assert_eq!(steam.extra["bookingSettings"]["instantBooking"], json!(true));
    }

    #[test]
    fn external_seed_file_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        fs::write(&path, r#"[{"id": "pest", "name": "Pest Control", "subCategories": ["Fumigation Services"]}]"#).unwrap();

        let categories = seed_categories(Some(&path)).unwrap();
        assert_eq!(categories.len(), 1);
        assert!(categories[0].declares("Fumigation Services"));

        fs::write(&path, r#"[{"name": "No id"}]"#).unwrap();
        assert!(matches!(seed_categories(Some(&path)), Err(CatalogError::Config(_))));
    }

    #[tokio::test]
    async fn live_categories_skip_malformed_documents() {
        let store = InMemoryStore::new();
        let mut plumbing = Fields::new();
        plumbing.insert("name".into(), json!("Plumbing & Water Services"));
        plumbing.insert("subCategories".into(), json!(["Drain Unclogging"]));
        store.set("serviceCategories", "plumbing", plumbing, false).await.unwrap();
        let mut broken = Fields::new();
        broken.insert("subCategories".into(), json!("not a list"));
        store.set("serviceCategories", "broken", broken, false).await.unwrap();

        let index = load_categories(&store, "serviceCategories").await.unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["plumbing"]);
        assert!(index["plumbing"].declares("Drain Unclogging"));
    }
}
