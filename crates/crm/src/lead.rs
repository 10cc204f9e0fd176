use serde::{Deserialize, Serialize};
use serde_json::Value;

use dealflow_core::{DomainResult, Validator, validation::as_object};

use crate::resource::Resource;

/// Inbound lead captured from the marketing site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Resource for Lead {
    const TABLE: &'static str = "leads";
    const SINGULAR: &'static str = "lead";
    const PLURAL: &'static str = "leads";
    const LABEL: &'static str = "Lead";
    const NATURAL_KEY: &'static str = "email";

    fn from_payload(payload: &Value) -> DomainResult<Self> {
        let fields = as_object(payload)?;
        let mut v = Validator::new(fields);

        let name = v.required_string("name", "Name is required");
        let email = v.required_email("email", "Valid email required");
        let phone = v.optional_string("phone");
        let source = v.optional_string("source");
        let notes = v.optional_string("notes");
        v.finish()?;

        Ok(Self {
            name,
            email,
            phone,
            source,
            notes,
        })
    }

    fn natural_key(&self) -> &str {
        &self.email
    }
}
