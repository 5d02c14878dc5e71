use crate::error::{CatalogError, Result};
use crate::types::{CategoryIndex, Service};

/// Import gate: the service's category must exist and its sub-service, when
/// present, must be one of that category's declared sub-categories (exact,
/// case-sensitive match).
pub fn validate(service: &Service, categories: &CategoryIndex) -> Result<()> {
    let category = categories
        .get(&service.category_id)
        .ok_or_else(|| CatalogError::InvalidCategory {
            category_id: service.category_id.clone(),
        })?;

    if let Some(sub_service) = service.sub_service() {
        if !category.declares(sub_service) {
            return Err(CatalogError::InvalidSubService {
                sub_service: sub_service.to_string(),
                category: category.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Fields, PricingType};

    fn beauty() -> CategoryIndex {
        let mut index = CategoryIndex::new();
        index.insert(
            "beauty".into(),
            Category {
                id: "beauty".into(),
                name: "Beauty & Personal Care (At Home)".into(),
                description: None,
                icon: Some("face".into()),
                color: None,
                sub_categories: vec![
                    "Haircut & Styling".into(),
                    "Braiding & Weaving".into(),
                    "Manicure & Pedicure".into(),
                    "Massage Therapy".into(),
                ],
                search_keywords: vec![],
                is_featured: false,
                is_popular: false,
                extra: Fields::new(),
            },
        );
        index
    }

    fn service(category_id: &str, sub_service: Option<&str>) -> Service {
        Service {
            name: "Kids Haircut Service".into(),
            description: String::new(),
            category_id: category_id.into(),
            category_name: None,
            sub_service: sub_service.map(str::to_string),
            price: 800.0,
            price_max: None,
            currency: "KES".into(),
            pricing_type: PricingType::Fixed,
            rating: 0.0,
            review_count: 0,
            booking_count: 0,
            features: vec![],
            images: vec![],
            image: None,
            provider_id: None,
            is_featured: false,
            is_popular: false,
            active: true,
            extra: Fields::new(),
        }
    }

    #[test]
    fn accepts_declared_sub_service() {
        assert!(validate(&service("beauty", Some("Haircut & Styling")), &beauty()).is_ok());
    }

    #[test]
    fn accepts_missing_or_empty_sub_service() {
        assert!(validate(&service("beauty", None), &beauty()).is_ok());
        assert!(validate(&service("beauty", Some("")), &beauty()).is_ok());
    }

    #[test]
    fn unknown_category_wins_regardless_of_sub_service() {
        for sub in [None, Some("Haircut & Styling"), Some("Nope")] {
            let err = validate(&service("beauty-personal", sub), &beauty()).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidCategory { .. }));
        }
    }

    #[test]
    fn sub_service_match_is_exact() {
        for sub in ["haircut & styling", "Haircut & Styling ", "Hair Styling"] {
            let err = validate(&service("beauty", Some(sub)), &beauty()).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidSubService { .. }), "{sub}");
        }
    }
}
