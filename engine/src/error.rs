//! Error types for the Shopfront engine.

use crate::{CollectionName, EntityId};
use thiserror::Error;

/// All possible errors from the Shopfront engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Mutation errors
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("entity already exists: {0}")]
    EntityAlreadyExists(EntityId),

    #[error("entity id must not be empty")]
    EmptyId,

    // Validation errors
    #[error("invalid fields: {0}")]
    InvalidFields(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    // Cache errors
    #[error("invalid cache blob: {0}")]
    InvalidCacheBlob(String),

    #[error("cache blob belongs to collection '{actual}', expected '{expected}'")]
    CollectionMismatch {
        expected: CollectionName,
        actual: CollectionName,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::EntityNotFound("p1".into());
        assert_eq!(err.to_string(), "entity not found: p1");

        let err = Error::CollectionMismatch {
            expected: "products".into(),
            actual: "orders".into(),
        };
        assert_eq!(
            err.to_string(),
            "cache blob belongs to collection 'orders', expected 'products'"
        );

        let err = Error::TypeMismatch {
            field: "price".into(),
            expected: "Float".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'price': expected Float, got String"
        );
    }
}
