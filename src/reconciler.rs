//! Brings one legacy service record in line with the current taxonomy.
//!
//! Steps run in a fixed order and each may patch a field:
//!
//! 1. remap a legacy `categoryId` through the category remap table
//! 2. remap a legacy `subService` through the sub-service remap table
//! 3. if the (remapped) `categoryId` is missing or not currently valid, infer it
//! 4. if the record has no `subService` and its category is now valid, infer
//!    one under that category
//!
//! Remap tables win over inference: they encode exact known corrections,
//! inference is only the fallback.

use crate::classifier::Classifier;
use crate::types::{FieldPatch, ServiceRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// How a field value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeType {
    Remapped,
    Inferred,
}

/// Field types that can be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldChanged {
    CategoryId,
    SubService,
}

impl std::fmt::Display for FieldChanged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldChanged::CategoryId => write!(f, "categoryId"),
            FieldChanged::SubService => write!(f, "subService"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: FieldChanged,
    pub change_type: ChangeType,
    pub from: Option<String>,
    pub to: String,
}

/// Outcome for one record: the sparse patch and the steps that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub patch: FieldPatch,
    pub changes: Vec<FieldChange>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.patch.is_empty()
    }
}

/// Computes the patch for `record`. Pure: the same record, tables and valid
/// id set always produce the same patch, and a reconciled record yields an
/// empty one.
pub fn reconcile(
    record: &ServiceRecord,
    valid_category_ids: &BTreeSet<String>,
    classifier: &Classifier<'_>,
) -> Reconciliation {
    let taxonomy = classifier.taxonomy();
    let mut changes = Vec::new();
    let mut category_id = record.category_id.clone();
    let mut sub_service = record.sub_service.clone();

    let mut change = |field, change_type, from: Option<&str>, to: &str| {
        changes.push(FieldChange {
            field,
            change_type,
            from: from.map(str::to_string),
            to: to.to_string(),
        });
    };

    if let Some(current) = record.category_id.as_deref() {
        if let Some(target) = taxonomy.remap_category(current).filter(|t| *t != current) {
            change(FieldChanged::CategoryId, ChangeType::Remapped, Some(current), target);
            category_id = Some(target.to_string());
        }
    }

    if let Some(current) = record.sub_service.as_deref() {
        if let Some(target) = taxonomy.remap_sub_service(current).filter(|t| *t != current) {
            change(FieldChanged::SubService, ChangeType::Remapped, Some(current), target);
            sub_service = Some(target.to_string());
        }
    }

    let text = record.search_text();

    let category_is_valid = category_id
        .as_deref()
        .is_some_and(|id| valid_category_ids.contains(id));
    if !category_is_valid {
        if let Some(inferred) = classifier.infer_category(&text) {
            if category_id.as_deref() != Some(inferred) {
                change(FieldChanged::CategoryId, ChangeType::Inferred, category_id.as_deref(), inferred);
                category_id = Some(inferred.to_string());
            }
        }
    }

    // Sub-services are only inferred under a currently valid category.
    let resolved = category_id
        .as_deref()
        .filter(|id| valid_category_ids.contains(*id));
    if record.sub_service.is_none() {
        let inferred = resolved.and_then(|id| classifier.infer_sub_category(&text, id));
        if let Some(inferred) = inferred {
            change(FieldChanged::SubService, ChangeType::Inferred, None, inferred);
            sub_service = Some(inferred.to_string());
        }
    }

    let patch = FieldPatch {
        category_id: category_id.filter(|id| record.category_id.as_ref() != Some(id)),
        sub_service: sub_service.filter(|sub| record.sub_service.as_ref() != Some(sub)),
    };

    Reconciliation { patch, changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MatchStrategy;
    use crate::taxonomy::Taxonomy;

    fn valid_ids() -> BTreeSet<String> {
        Taxonomy::builtin().categories.iter().cloned().collect()
    }

    fn classifier() -> Classifier<'static> {
        Classifier::new(Taxonomy::builtin(), MatchStrategy::FirstMatch)
    }

    fn record(name: &str, category_id: Option<&str>, sub_service: Option<&str>) -> ServiceRecord {
        ServiceRecord {
            id: "svc".into(),
            name: Some(name.into()),
            description: None,
            category_id: category_id.map(str::to_string),
            sub_service: sub_service.map(str::to_string),
        }
    }

    fn apply(record: &ServiceRecord, patch: &FieldPatch) -> ServiceRecord {
        let mut next = record.clone();
        if let Some(id) = &patch.category_id {
            next.category_id = Some(id.clone());
        }
        if let Some(sub) = &patch.sub_service {
            next.sub_service = Some(sub.clone());
        }
        next
    }

    #[test]
    fn remaps_legacy_category_then_infers_sub_service() {
        let input = record("Pipe Leak Repair", Some("cat2"), None);
        let result = reconcile(&input, &valid_ids(), &classifier());

        assert_eq!(result.patch.category_id.as_deref(), Some("plumbing"));
        assert_eq!(result.patch.sub_service.as_deref(), Some("Leak Detection & Repair"));
        assert_eq!(result.changes[0].change_type, ChangeType::Remapped);
        assert_eq!(result.changes[1].change_type, ChangeType::Inferred);
    }

    #[test]
    fn remap_beats_inference() {
        // The text says cleaning, but cat2 is a known plumbing id.
        let input = record("Carpet cleaning", Some("cat2"), Some("Emergency Plumbing"));
        let result = reconcile(&input, &valid_ids(), &classifier());
        assert_eq!(result.patch.category_id.as_deref(), Some("plumbing"));
    }

    #[test]
    fn valid_record_needs_no_patch() {
        let input = record("Kids Haircut Service", Some("beauty"), Some("Haircut & Styling"));
        assert!(reconcile(&input, &valid_ids(), &classifier()).is_noop());
    }

    #[test]
    fn unknown_category_without_keywords_is_left_alone() {
        let input = record("Bespoke consulting", Some("unknown-id"), None);
        let result = reconcile(&input, &valid_ids(), &classifier());
        assert!(result.is_noop());
        assert!(result.changes.is_empty());
    }

    #[test]
    fn missing_category_is_inferred() {
        let input = record("Weekly lawn care", None, None);
        let result = reconcile(&input, &valid_ids(), &classifier());
        assert_eq!(result.patch.category_id.as_deref(), Some("gardening"));
        assert_eq!(result.patch.sub_service.as_deref(), Some("Lawn Mowing"));
    }

    #[test]
    fn identity_remap_produces_no_patch() {
        let input = record("Deep clean", Some("cleaning"), Some("Deep Cleaning"));
        assert!(reconcile(&input, &valid_ids(), &classifier()).is_noop());
    }

    #[test]
    fn unresolved_category_gets_no_sub_service() {
        let mut narrow = valid_ids();
        narrow.remove("tech");
        // "backup" holds "ac", a tech sub-rule keyword.
        let input = record("Backup", Some("tech"), None);
        let result = reconcile(&input, &narrow, &classifier());
        assert!(result.is_noop());
        assert!(result.changes.is_empty());
    }

    #[test]
    fn second_pass_converges_with_narrow_live_categories() {
        let mut narrow = valid_ids();
        narrow.remove("tech");
        narrow.remove("pest");
        let inputs = [
            record("Backup", Some("tech"), None),
            record("TV mounting", Some("tech-appliance"), None),
            record("Cockroach fumigation", Some("pest-control"), None),
            record("Pipe Leak Repair", Some("cat2"), None),
            record("Weekly lawn care", None, None),
            record("Laptop screen", Some("unknown-id"), None),
        ];
        for strategy in [MatchStrategy::FirstMatch, MatchStrategy::Scored] {
            let classifier = Classifier::new(Taxonomy::builtin(), strategy);
            for input in &inputs {
                let first = reconcile(input, &narrow, &classifier);
                let reconciled = apply(input, &first.patch);
                let second = reconcile(&reconciled, &narrow, &classifier);
                assert!(second.is_noop(), "{:?} {:?} -> {:?}", strategy, input, second.patch);
            }
        }
    }

    #[test]
    fn second_pass_converges() {
        let inputs = [
            record("Pipe Leak Repair", Some("cat2"), None),
            record("Home Salon Service", Some("beauty-personal-care"), Some("Hair Styling")),
            record("Office move", None, Some("Local Moving")),
            record("TV mounting", Some("tech-appliance"), None),
            record("Bespoke consulting", Some("unknown-id"), None),
        ];
        for input in inputs {
            let first = reconcile(&input, &valid_ids(), &classifier());
            let reconciled = apply(&input, &first.patch);
            let second = reconcile(&reconciled, &valid_ids(), &classifier());
            assert!(second.is_noop(), "{:?} -> {:?}", input, second.patch);
        }
    }
}
