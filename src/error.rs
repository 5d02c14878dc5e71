use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid category ID: {category_id}")]
    InvalidCategory { category_id: String },

    #[error("Invalid sub-service \"{sub_service}\" for category {category}")]
    InvalidSubService { sub_service: String, category: String },

    #[error("Write failed: {message}")]
    WriteFailure { message: String },

    #[error("Store initialization failed: {0}")]
    FatalInit(String),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Only initialization failures may terminate a run; everything else is
    /// counted per record and the run carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::FatalInit(_) | CatalogError::Config(_))
    }

    /// Validation rejections (skip the record, never retry).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CatalogError::InvalidCategory { .. } | CatalogError::InvalidSubService { .. }
        )
    }

    pub fn store(message: impl Into<String>) -> Self {
        CatalogError::Store {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        CatalogError::WriteFailure {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_init_and_config_errors_are_fatal() {
        assert!(CatalogError::FatalInit("no store".into()).is_fatal());
        assert!(CatalogError::Config("bad chunk".into()).is_fatal());
        assert!(!CatalogError::write("boom").is_fatal());
        assert!(!CatalogError::InvalidCategory {
            category_id: "x".into()
        }
        .is_fatal());
    }

    #[test]
    fn validation_messages_name_the_offender() {
        let err = CatalogError::InvalidSubService {
            sub_service: "Hair Styling".into(),
            category: "Beauty & Personal Care (At Home)".into(),
        };
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Invalid sub-service \"Hair Styling\" for category Beauty & Personal Care (At Home)"
        );
    }
}
