//! Field validation rules shared by every resource schema.
//!
//! A [`Validator`] walks a JSON object and records a message for every rule
//! that fails. It never stops at the first violation, so a client gets the
//! complete list back in a single `400` response.
//!
//! `null` is treated the same as an absent field for optional rules.

use serde_json::{Map, Number, Value};

use crate::error::{DomainError, DomainResult};

/// Borrow the payload as a JSON object, or fail with a single violation.
pub fn as_object(payload: &Value) -> DomainResult<&Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| DomainError::validation("Expected a JSON object"))
}

/// Collects rule violations for one JSON object.
#[derive(Debug)]
pub struct Validator<'a> {
    fields: &'a Map<String, Value>,
    violations: Vec<String>,
}

impl<'a> Validator<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            violations: Vec::new(),
        }
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    /// Whether the payload carries a non-null value for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.present(field).is_some()
    }

    /// Record a violation that does not belong to a single built-in rule.
    pub fn reject(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    /// Required string that must contain something other than whitespace.
    ///
    /// Returns an empty string when the rule fails; callers only use the
    /// value after [`Validator::finish`] succeeds.
    pub fn required_string(&mut self, field: &str, message: &str) -> String {
        match self.present(field).and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => {
                self.reject(message);
                String::new()
            }
        }
    }

    /// Required, syntactically valid email address.
    pub fn required_email(&mut self, field: &str, message: &str) -> String {
        match self.present(field).and_then(Value::as_str) {
            Some(s) if is_valid_email(s) => s.to_string(),
            _ => {
                self.reject(message);
                String::new()
            }
        }
    }

    pub fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.reject(format!("{field} must be a string"));
                None
            }
        }
    }

    /// Optional string that, when present, must not be blank.
    pub fn optional_nonempty_string(&mut self, field: &str, message: &str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => {
                self.reject(message);
                None
            }
        }
    }

    /// Optional boolean with an explicit type check: `"yes"` is a violation.
    pub fn optional_bool(&mut self, field: &str, message: &str) -> Option<bool> {
        match self.present(field)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.reject(message);
                None
            }
        }
    }

    /// Optional value drawn from a fixed set.
    pub fn optional_enum(&mut self, field: &str, allowed: &[&str], message: &str) -> Option<String> {
        match self.present(field)?.as_str() {
            Some(s) if allowed.contains(&s) => Some(s.to_string()),
            _ => {
                self.reject(message);
                None
            }
        }
    }

    /// Required number, optionally bounded below.
    ///
    /// The original [`Number`] is returned so integers stay integers when the
    /// record is written back out.
    pub fn required_number(
        &mut self,
        field: &str,
        type_message: &str,
        min: Option<(f64, &str)>,
    ) -> Number {
        match self.present(field) {
            Some(Value::Number(n)) => {
                self.check_min(n, min);
                n.clone()
            }
            _ => {
                self.reject(type_message);
                Number::from(0)
            }
        }
    }

    pub fn optional_number(
        &mut self,
        field: &str,
        type_message: &str,
        min: Option<(f64, &str)>,
    ) -> Option<Number> {
        match self.present(field)? {
            Value::Number(n) => {
                self.check_min(n, min);
                Some(n.clone())
            }
            _ => {
                self.reject(type_message);
                None
            }
        }
    }

    fn check_min(&mut self, n: &Number, min: Option<(f64, &str)>) {
        if let Some((bound, message)) = min {
            if n.as_f64().is_some_and(|n| n < bound) {
                self.reject(message);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// `Ok` when no rule failed, otherwise every collected message.
    pub fn finish(self) -> DomainResult<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.violations))
        }
    }
}

/// Syntactic email check: `local@label.label`, no whitespace, alphabetic TLD.
pub fn is_valid_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|l| {
        !l.is_empty()
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("alpha@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "a@", "a@b", "a@b.c", "a b@example.com", "a@@example.com", "a@-x.com", ".a@example.com", "a..b@example.com"] {
            assert!(!is_valid_email(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn collects_every_violation() {
        let fields = obj(json!({ "name": "", "email": "nope", "accredited": "yes" }));
        let mut v = Validator::new(&fields);
        v.required_string("name", "Name is required");
        v.required_email("email", "Valid email required");
        v.optional_bool("accredited", "Accredited must be boolean");

        let err = v.finish().unwrap_err();
        assert_eq!(
            err.messages(),
            vec!["Name is required", "Valid email required", "Accredited must be boolean"]
        );
    }

    #[test]
    fn whitespace_only_string_is_missing() {
        let fields = obj(json!({ "name": "   " }));
        let mut v = Validator::new(&fields);
        v.required_string("name", "Name is required");
        assert!(!v.is_valid());
    }

    #[test]
    fn null_optional_fields_are_absent() {
        let fields = obj(json!({ "notes": null, "accredited": null }));
        let mut v = Validator::new(&fields);
        assert_eq!(v.optional_string("notes"), None);
        assert_eq!(v.optional_bool("accredited", "Accredited must be boolean"), None);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn optional_string_rejects_wrong_type() {
        let fields = obj(json!({ "phone": 5550000 }));
        let mut v = Validator::new(&fields);
        assert_eq!(v.optional_string("phone"), None);
        assert_eq!(v.violations(), ["phone must be a string"]);
    }

    #[test]
    fn enum_and_number_rules() {
        let fields = obj(json!({ "stage": "invalid", "value": -5, "amount": "10" }));
        let mut v = Validator::new(&fields);
        v.optional_enum("stage", &["new", "review"], "Invalid stage");
        v.required_number("value", "Value must be a number", Some((0.0, "Value must be positive")));
        v.optional_number("amount", "Amount must be a number", None);
        assert_eq!(
            v.violations(),
            ["Invalid stage", "Value must be positive", "Amount must be a number"]
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = as_object(&json!([1, 2])).unwrap_err();
        assert_eq!(err.messages(), vec!["Expected a JSON object"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn strings_without_at_sign_are_never_emails(s in "[a-z0-9. _-]{0,24}") {
            prop_assert!(!is_valid_email(&s));
        }

        #[test]
        fn well_formed_addresses_validate(local in "[a-z][a-z0-9]{0,10}", domain in "[a-z][a-z0-9]{0,10}", tld in "[a-z]{2,6}") {
            let addr = format!("{local}@{domain}.{tld}");
            prop_assert!(is_valid_email(&addr));
        }
    }
}
