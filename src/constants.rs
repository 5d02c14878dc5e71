/// Collection and field name constants shared by every script so the
/// on-store layout stays consistent.

// Default collection names
pub const CATEGORIES_COLLECTION: &str = "serviceCategories";
pub const SERVICES_COLLECTION: &str = "services";
pub const FEATURED_COLLECTION: &str = "featured_services";
pub const POPULAR_COLLECTION: &str = "popular_services";

// Service document fields touched by the reconciler
pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_CATEGORY_ID: &str = "categoryId";
pub const FIELD_SUB_SERVICE: &str = "subService";

// Timestamps attached on every write
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Hard per-batch write limit of the reference document store.
pub const MAX_BATCH_WRITES: usize = 500;

/// Chunk size used by the batch writer, leaving headroom below the store limit.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

// Defaults used when expanding the per-sub-service catalog
pub const DEFAULT_SERVICE_LOCATION: &str = "Nairobi, Kenya";
pub const DEFAULT_CURRENCY: &str = "KES";

// Config discovery
pub const DEFAULT_CONFIG_PATH: &str = "catalog.toml";
pub const CONFIG_ENV_VAR: &str = "CATALOG_CONFIG";
pub const DEFAULT_STORE_PATH: &str = "data/store.json";
