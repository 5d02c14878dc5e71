//! Immutable rule tables driving reconciliation: the valid category ids, the
//! legacy remap tables and the keyword rules used for inference.
//!
//! The tables are plain data. The built-in set is embedded from
//! `data/taxonomy.toml`; a deployment can point `taxonomy.path` at its own file.

use crate::error::{CatalogError, Result};
use crate::types::CategoryIndex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const BUILTIN_TAXONOMY: &str = include_str!("../data/taxonomy.toml");

static BUILTIN: Lazy<Taxonomy> = Lazy::new(|| {
    Taxonomy::from_toml_str(BUILTIN_TAXONOMY).expect("embedded data/taxonomy.toml is valid")
});

/// Maps any keyword hit to a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Maps any keyword hit to a sub-category of the enclosing rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryRule {
    pub sub_category: String,
    pub keywords: Vec<String>,
}

/// Ordered sub-category rules for one category, with its fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryRuleSet {
    pub category: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub rules: Vec<SubCategoryRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Current valid category identifiers
    pub categories: Vec<String>,
    #[serde(default)]
    pub category_remap: BTreeMap<String, String>,
    #[serde(default)]
    pub sub_service_remap: BTreeMap<String, String>,
    #[serde(default)]
    pub category_rules: Vec<CategoryRule>,
    #[serde(default)]
    pub sub_category_rules: Vec<SubCategoryRuleSet>,
}

impl Taxonomy {
    pub fn builtin() -> &'static Taxonomy {
        &BUILTIN
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("Failed to read taxonomy file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CatalogError::Config(e.to_string()))
    }

    pub fn is_declared(&self, category_id: &str) -> bool {
        self.categories.iter().any(|c| c == category_id)
    }

    pub fn remap_category(&self, category_id: &str) -> Option<&str> {
        self.category_remap.get(category_id).map(String::as_str)
    }

    pub fn remap_sub_service(&self, sub_service: &str) -> Option<&str> {
        self.sub_service_remap.get(sub_service).map(String::as_str)
    }

    pub fn sub_rules_for(&self, category_id: &str) -> Option<&SubCategoryRuleSet> {
        self.sub_category_rules.iter().find(|set| set.category == category_id)
    }

    /// Checks the tables reference only declared categories and, when a
    /// catalog is given, only declared sub-categories. All problems are
    /// reported at once.
    pub fn validate(&self, catalog: Option<&CategoryIndex>) -> Result<()> {
        let mut problems = Vec::new();

        for (from, to) in &self.category_remap {
            if !self.is_declared(to) {
                problems.push(format!("category remap {} -> {} targets an undeclared category", from, to));
            }
        }
        for rule in &self.category_rules {
            if !self.is_declared(&rule.category) {
                problems.push(format!("category rule for undeclared category {}", rule.category));
            }
            if rule.keywords.iter().any(|k| k.is_empty()) {
                problems.push(format!("category rule for {} has an empty keyword", rule.category));
            }
        }
        for set in &self.sub_category_rules {
            if !self.is_declared(&set.category) {
                problems.push(format!("sub-category rules for undeclared category {}", set.category));
                continue;
            }
            let Some(category) = catalog.and_then(|c| c.get(&set.category)) else {
                continue;
            };
            let targets = set
                .rules
                .iter()
                .map(|r| r.sub_category.as_str())
                .chain(set.default.as_deref());
            for target in targets {
                if !category.declares(target) {
                    problems.push(format!("\"{}\" is not a sub-category of {}", target, set.category));
                }
            }
        }
        if let Some(catalog) = catalog {
            for (from, to) in &self.sub_service_remap {
                if !catalog.values().any(|c| c.declares(to)) {
                    problems.push(format!("sub-service remap \"{}\" -> \"{}\" targets an undeclared sub-category", from, to));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Config(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_self_consistent() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.categories.len(), 10);
        assert_eq!(taxonomy.category_rules.len(), 10);
        taxonomy.validate(None).unwrap();
    }

    #[test]
    fn builtin_remaps_cover_legacy_ids() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.remap_category("cat2"), Some("plumbing"));
        assert_eq!(taxonomy.remap_category("tech-appliances"), Some("tech"));
        assert_eq!(taxonomy.remap_category("plumbing"), None);
        assert_eq!(
            taxonomy.remap_sub_service("Regular Home Cleaning"),
            Some("Standard Home Cleaning")
        );
    }

    #[test]
    fn keyword_spacing_is_preserved() {
        let tech = Taxonomy::builtin()
            .category_rules
            .iter()
            .find(|r| r.category == "tech")
            .unwrap();
        assert!(tech.keywords.iter().any(|k| k == "ac "));
    }

    #[test]
    fn validate_reports_undeclared_targets() {
        let taxonomy = Taxonomy::from_toml_str(
            r#"
categories = ["cleaning"]

[category_remap]
cat2 = "plumbing"

[[category_rules]]
category = "laundry"
keywords = ["wash"]
"#,
        )
        .unwrap();

        let err = taxonomy.validate(None).unwrap_err().to_string();
        assert!(err.contains("cat2 -> plumbing"));
        assert!(err.contains("undeclared category laundry"));
    }
}
