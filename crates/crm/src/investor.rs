use serde::{Deserialize, Serialize};
use serde_json::Value;

use dealflow_core::{DomainResult, Validator, validation::as_object};

use crate::resource::Resource;

/// Prospective or active investor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    pub name: String,
    pub email: String,
    /// Whether the investor is accredited. Must be a real JSON boolean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accredited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Resource for Investor {
    const TABLE: &'static str = "investors";
    const SINGULAR: &'static str = "investor";
    const PLURAL: &'static str = "investors";
    const LABEL: &'static str = "Investor";
    const NATURAL_KEY: &'static str = "email";

    fn from_payload(payload: &Value) -> DomainResult<Self> {
        let fields = as_object(payload)?;
        let mut v = Validator::new(fields);

        let name = v.required_string("name", "Name is required");
        let email = v.required_email("email", "Valid email required");
        let accredited = v.optional_bool("accredited", "Accredited must be boolean");
        let notes = v.optional_string("notes");
        v.finish()?;

        Ok(Self {
            name,
            email,
            accredited,
            notes,
        })
    }

    fn natural_key(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_core::DomainError;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn accepts_accredited_investor() {
        let investor = Investor::from_payload(&json!({
            "name": "Investor Alpha",
            "email": "alpha@example.com",
            "accredited": true
        }))
        .unwrap();
        assert_eq!(investor.accredited, Some(true));
    }

    #[test]
    fn accredited_must_be_boolean() {
        let err = Investor::from_payload(&json!({
            "name": "Investor Gamma",
            "email": "gamma@example.com",
            "accredited": "yes"
        }))
        .unwrap_err();
        assert_eq!(err, DomainError::Validation(vec!["Accredited must be boolean".into()]));
    }

    #[test]
    fn reports_all_missing_fields_at_once() {
        let err = Investor::from_payload(&json!({})).unwrap_err();
        assert_eq!(
            err.messages(),
            vec!["Name is required", "Valid email required"]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn every_bad_field_gets_a_message(bad_email in "[a-z]{1,12}", notes in any::<i64>()) {
            let payload = json!({ "email": bad_email, "accredited": 1, "notes": notes });
            let err = Investor::from_payload(&payload).unwrap_err();
            prop_assert_eq!(err.messages().len(), 4);
        }
    }
}
