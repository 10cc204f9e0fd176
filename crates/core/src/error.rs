//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// conflicts, missing records). Store and transport concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields failed validation. Every violated rule is listed.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found.
    #[error("{0}")]
    NotFound(String),

    /// A natural key collided with an existing record.
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Conflict on a natural key, e.g. `Duplicate investor email`.
    pub fn duplicate(resource: &str, key: &str) -> Self {
        Self::Conflict(format!("Duplicate {resource} {key}"))
    }

    /// Messages suitable for a client-facing error list.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(msgs) => msgs.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_formats_resource_and_key() {
        let err = DomainError::duplicate("investor", "email");
        assert_eq!(err.to_string(), "Duplicate investor email");
    }

    #[test]
    fn validation_lists_every_message() {
        let err = DomainError::Validation(vec!["Name is required".into(), "Valid email required".into()]);
        assert_eq!(err.messages().len(), 2);
        assert_eq!(
            err.to_string(),
            "validation failed: Name is required; Valid email required"
        );
    }
}
