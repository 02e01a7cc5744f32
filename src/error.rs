use thiserror::Error;

/// Errors raised by the persistence core.
///
/// Repositories and mappers raise these immediately; the unit of work and the
/// service only intercept them to roll back, then hand them on unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("{0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transaction error: {0}")]
    Transaction(&'static str),
}

impl StoreError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unknown_node_type(discriminator: &str) -> Self {
        Self::Configuration(format!("Unknown node type: {discriminator}"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn not_found_names_entity_and_id() {
        let err = StoreError::NotFound {
            entity: "Tree",
            id: 12,
        };
        assert_eq!(err.to_string(), "Tree with ID 12 not found");
    }

    #[test]
    fn unknown_node_type_is_configuration_error() {
        let err = StoreError::unknown_node_type("FancyNode");
        assert!(matches!(err, StoreError::Configuration(_)));
        assert_eq!(err.to_string(), "Unknown node type: FancyNode");
    }

    #[test]
    fn storage_failure_wraps_rusqlite_error() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().starts_with("storage failure:"));
    }
}
