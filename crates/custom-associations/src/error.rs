//! Error types for custom associations
//!
//! Declaration errors are fatal to model definition, call-time errors
//! (unsupported write paths, missing associations) are recoverable by the caller.

use thiserror::Error;

/// Result type alias for association operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for association declaration, resolution and loading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// An option key that the association macro does not accept
    #[error("Unknown key :{key} for association '{association}'. Valid keys are: {valid}")]
    InvalidOption {
        key: String,
        association: String,
        valid: String,
    },

    /// A write-path method invoked on an association that does not provide it
    #[error("Undefined method '{method}' for association '{association}'")]
    UnsupportedOperation { method: String, association: String },

    /// An inline extension block redeclared while redeclaration is rejected
    #[error("Extension module '{module}' is already defined")]
    Redeclaration { module: String },

    /// Association or model metadata is inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Association name not declared on the model
    #[error("Association named '{association}' was not found on {model}")]
    AssociationNotFound { model: String, association: String },

    /// Model class not defined in the registry
    #[error("Model '{0}' is not defined")]
    ModelNotFound(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    pub(crate) fn unsupported(method: impl Into<String>, association: impl Into<String>) -> Self {
        ModelError::UnsupportedOperation {
            method: method.into(),
            association: association.into(),
        }
    }

    pub(crate) fn association_not_found(model: &str, association: &str) -> Self {
        ModelError::AssociationNotFound {
            model: model.to_string(),
            association: association.to_string(),
        }
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_message() {
        let err = ModelError::InvalidOption {
            key: "foreign_key".to_string(),
            association: "address".to_string(),
            valid: ":joins, :conditions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown key :foreign_key for association 'address'. Valid keys are: :joins, :conditions"
        );
    }

    #[test]
    fn test_unsupported_operation_message() {
        let err = ModelError::unsupported("destroy", "address");
        assert_eq!(err.to_string(), "Undefined method 'destroy' for association 'address'");
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ModelError = parse_err.into();
        assert!(matches!(err, ModelError::Serialization(_)));
    }
}
