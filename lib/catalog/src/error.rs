//! Error types for catalog operations.

use crate::item::CatalogItemId;
use std::fmt;

/// Errors from catalog port operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No item with the given identifier.
    NotFound { id: CatalogItemId },
    /// No credentials configured, or the catalog rejected them.
    CredentialsMissing,
    /// Request to the catalog failed.
    RequestFailed { reason: String },
    /// The catalog response could not be parsed.
    ParseFailed { reason: String },
    /// An availability write was rejected.
    WriteFailed { reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "catalog item not found: {id}"),
            Self::CredentialsMissing => write!(f, "catalog credentials missing or rejected"),
            Self::RequestFailed { reason } => write!(f, "catalog request failed: {reason}"),
            Self::ParseFailed { reason } => {
                write!(f, "failed to parse catalog response: {reason}")
            }
            Self::WriteFailed { reason } => write!(f, "catalog write failed: {reason}"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::NotFound {
            id: CatalogItemId::new("ITEM_9"),
        };
        assert!(err.to_string().contains("ITEM_9"));

        let err = CatalogError::WriteFailed {
            reason: "version conflict".to_string(),
        };
        assert!(err.to_string().contains("version conflict"));
    }
}
