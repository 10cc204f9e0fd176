use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by the persistence collaborator.
///
/// The display text is what clients see in a `500` body, so it carries the
/// backend's own message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Any backend failure (connection, query, poisoned lock, ...).
    #[error("{0}")]
    Backend(String),

    /// A store-level unique constraint rejected the write.
    #[error("duplicate key value violates unique constraint on {table}.{column}")]
    UniqueViolation { table: String, column: String },

    /// A table or column name was not a plain SQL identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Table and column names are interpolated into SQL, so only
/// `[a-z_][a-z0-9_]*` is accepted.
pub fn check_identifier(name: &str) -> StoreResult<&str> {
    let mut chars = name.chars();
    let ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(check_identifier("opportunities").is_ok());
        assert!(check_identifier("rent_monthly2").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("leads; drop table x").is_err());
        assert!(check_identifier("Leads").is_err());
    }
}
