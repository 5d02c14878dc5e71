use crate::constants::{
    DEFAULT_CURRENCY, FIELD_CATEGORY_ID, FIELD_CREATED_AT, FIELD_DESCRIPTION, FIELD_NAME,
    FIELD_SUB_SERVICE, FIELD_UPDATED_AT,
};
use crate::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw field map of a stored document
pub type Fields = serde_json::Map<String, Value>;

/// Category identifier -> category, as read from the store
pub type CategoryIndex = BTreeMap<String, Category>;

/// A document as returned by the store: its id plus its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// String field value; empty strings read as absent.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// How a service is priced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricingType {
    #[default]
    Fixed,
    Hourly,
    #[serde(alias = "per_unit")]
    PerUnit,
    PerSession,
}

/// A top-level service grouping with its complete list of valid sub-categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub sub_categories: Vec<String>,
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_popular: bool,
    /// Display metadata that varies per category (service options, policies...)
    #[serde(flatten)]
    pub extra: Fields,
}

impl Category {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut category: Category = serde_json::from_value(Value::Object(doc.fields.clone()))?;
        category.id = doc.id.clone();
        Ok(category)
    }

    pub fn to_fields(&self) -> Result<Fields> {
        to_fields(self)
    }

    pub fn declares(&self, sub_category: &str) -> bool {
        self.sub_categories.iter().any(|s| s == sub_category)
    }
}

/// A bookable service record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_service: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub pricing_type: PricingType,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub booking_count: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Category-specific fields (property size, frequency options...) that
    /// are stored as-is and never validated against a shared schema
    #[serde(flatten)]
    pub extra: Fields,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_active() -> bool {
    true
}

impl Service {
    /// Sub-service with empty strings treated as absent
    pub fn sub_service(&self) -> Option<&str> {
        self.sub_service.as_deref().filter(|s| !s.is_empty())
    }

    /// Newly seeded records start with no rating, reviews or bookings.
    pub fn reset_counters(&mut self) {
        self.rating = 0.0;
        self.review_count = 0;
        self.booking_count = 0;
    }

    pub fn to_fields(&self) -> Result<Fields> {
        to_fields(self)
    }
}

fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(CatalogError::store(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// The fields of a stored service that reconciliation looks at. Read
/// leniently: legacy records may lack any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub sub_service: Option<String>,
}

impl ServiceRecord {
    pub fn from_document(doc: &Document) -> Self {
        let get = |key: &str| doc.str_field(key).map(str::to_string);
        Self {
            id: doc.id.clone(),
            name: get(FIELD_NAME),
            description: get(FIELD_DESCRIPTION),
            category_id: get(FIELD_CATEGORY_ID),
            sub_service: get(FIELD_SUB_SERVICE),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Lower-cased `name description subService`, the classifier input.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            self.sub_service.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }
}

/// Sparse set of field changes for one service record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_service: Option<String>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && self.sub_service.is_none()
    }

    /// Field map for a store update, stamped with `updatedAt`.
    pub fn into_fields(self, now: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        if let Some(category_id) = self.category_id {
            fields.insert(FIELD_CATEGORY_ID.to_string(), Value::String(category_id));
        }
        if let Some(sub_service) = self.sub_service {
            fields.insert(FIELD_SUB_SERVICE.to_string(), Value::String(sub_service));
        }
        stamp_updated(&mut fields, now);
        fields
    }
}

pub fn stamp_created(fields: &mut Fields, now: DateTime<Utc>) {
    fields.insert(FIELD_CREATED_AT.to_string(), Value::String(now.to_rfc3339()));
    stamp_updated(fields, now);
}

pub fn stamp_updated(fields: &mut Fields, now: DateTime<Utc>) {
    fields.insert(FIELD_UPDATED_AT.to_string(), Value::String(now.to_rfc3339()));
}
