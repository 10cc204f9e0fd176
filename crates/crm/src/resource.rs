use serde::Serialize;
use serde_json::Value;

pub use dealflow_core::Row;
use dealflow_core::{DomainError, DomainResult};

/// Column holding the server-assigned creation timestamp.
pub const CREATED_FIELD: &str = "created";

/// Column holding the store-assigned identifier.
pub const ID_FIELD: &str = "id";

/// A CRM resource served by the generic CRUD handler.
///
/// Implementors are the validated, request-scoped copy of a record before it
/// is written; the store owns the persisted row.
pub trait Resource: Serialize + Sized + Send + Sync + 'static {
    /// Store table, e.g. `investors`.
    const TABLE: &'static str;
    /// Singular noun, used as the response key and in messages.
    const SINGULAR: &'static str;
    /// Plural noun, used as the list response key.
    const PLURAL: &'static str;
    /// Capitalized noun for messages like `Investor created`.
    const LABEL: &'static str;
    /// Field that must be unique across all records of this kind.
    const NATURAL_KEY: &'static str;

    /// Validate a create payload, collecting every violated rule.
    fn from_payload(payload: &Value) -> DomainResult<Self>;

    fn natural_key(&self) -> &str;

    /// Whether the resource accepts partial updates.
    const PATCHABLE: bool = false;

    /// Validate the fields of a partial update (everything except `id`),
    /// returning only the recognized, validated changes.
    fn validate_patch(fields: &Row) -> DomainResult<Row> {
        let _ = fields;
        Err(DomainError::validation(format!(
            "{} does not support partial updates",
            Self::LABEL
        )))
    }

    /// The row to insert: schema fields plus the creation timestamp.
    fn to_row(&self, created: &str) -> serde_json::Result<Row> {
        let mut row = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Row::new(),
        };
        row.insert(CREATED_FIELD.to_string(), Value::String(created.to_string()));
        Ok(row)
    }
}
