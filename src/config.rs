use crate::classifier::MatchStrategy;
use crate::constants::{
    CATEGORIES_COLLECTION, CONFIG_ENV_VAR, DEFAULT_CHUNK_SIZE, DEFAULT_CONFIG_PATH,
    DEFAULT_STORE_PATH, FEATURED_COLLECTION, MAX_BATCH_WRITES, POPULAR_COLLECTION,
    SERVICES_COLLECTION,
};
use crate::error::{CatalogError, Result};
use crate::taxonomy::Taxonomy;
use serde::Deserialize;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub writer: WriterConfig,
    pub collections: CollectionNames,
    pub taxonomy: TaxonomyConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot backing the document store
    pub path: PathBuf,
    pub max_batch_writes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            max_batch_writes: MAX_BATCH_WRITES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub chunk_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub categories: String,
    pub services: String,
    pub featured: String,
    pub popular: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            categories: CATEGORIES_COLLECTION.to_string(),
            services: SERVICES_COLLECTION.to_string(),
            featured: FEATURED_COLLECTION.to_string(),
            popular: POPULAR_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Replaces the built-in rule tables when set
    pub path: Option<PathBuf>,
    pub strategy: MatchStrategy,
}

impl Config {
    /// Config file to use: the explicit path, then `CATALOG_CONFIG`, then
    /// `catalog.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads and checks the config; a missing file yields the defaults.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            CatalogError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&config_content)?;
        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.store.max_batch_writes == 0 {
            return Err(CatalogError::Config("store.max_batch_writes must be positive".into()));
        }
        if self.writer.chunk_size == 0 || self.writer.chunk_size > self.store.max_batch_writes {
            return Err(CatalogError::Config(format!(
                "writer.chunk_size {} must be between 1 and store.max_batch_writes ({})",
                self.writer.chunk_size, self.store.max_batch_writes
            )));
        }
        Ok(())
    }

    /// The rule tables in effect: the configured file or the built-in set.
    pub fn load_taxonomy(&self) -> Result<Cow<'static, Taxonomy>> {
        match &self.taxonomy.path {
            Some(path) => {
                let taxonomy = Taxonomy::load(path)?;
                taxonomy.validate(None)?;
                info!("Using taxonomy from {}", path.display());
                Ok(Cow::Owned(taxonomy))
            }
            None => Ok(Cow::Borrowed(Taxonomy::builtin())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.writer.chunk_size, 400);
        assert_eq!(config.collections.categories, "serviceCategories");
        assert_eq!(config.taxonomy.strategy, MatchStrategy::FirstMatch);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml_str(
            r#"
            [store]
            path = "/tmp/catalog.json"

            [collections]
            services = "services_staging"

            [taxonomy]
            strategy = "scored"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.path, PathBuf::from("/tmp/catalog.json"));
        assert_eq!(config.store.max_batch_writes, 500);
        assert_eq!(config.collections.services, "services_staging");
        assert_eq!(config.collections.popular, "popular_services");
        assert_eq!(config.taxonomy.strategy, MatchStrategy::Scored);
    }

    #[test]
    fn chunk_size_over_store_limit_is_rejected() {
        let err = Config::from_toml_str(
            r#"
            [store]
            max_batch_writes = 100

            [writer]
            chunk_size = 400
            "#,
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("catalog.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn taxonomy_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxonomy.toml");
        fs::write(
            &path,
            r#"
            categories = ["pest"]

            [category_remap]
            "pest-control" = "pest"

            [[category_rules]]
            category = "pest"
            keywords = ["termite"]
            "#,
        )
        .unwrap();

        let config = Config {
            taxonomy: TaxonomyConfig {
                path: Some(path),
                strategy: MatchStrategy::FirstMatch,
            },
            ..Config::default()
        };
        let taxonomy = config.load_taxonomy().unwrap();
        assert_eq!(taxonomy.categories, vec!["pest"]);
        assert!(Config::default().load_taxonomy().unwrap().categories.len() == 10);
    }
}
