use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use dealflow_core::{DomainError, DomainResult, Validator, validation::as_object};

use crate::resource::{Resource, Row};

/// Pipeline stage of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Review,
    Negotiation,
    Closed,
    Lost,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::New,
        Stage::Review,
        Stage::Negotiation,
        Stage::Closed,
        Stage::Lost,
    ];

    /// Wire names, in pipeline order.
    pub const NAMES: [&'static str; 5] = ["new", "review", "negotiation", "closed", "lost"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Review => "review",
            Stage::Negotiation => "negotiation",
            Stage::Closed => "closed",
            Stage::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }
}

const TITLE_REQUIRED: &str = "Title is required";
const VALUE_NUMBER: &str = "Value must be a number";
const VALUE_POSITIVE: &str = "Value must be positive";
const INVALID_STAGE: &str = "Invalid stage";

/// A deal moving through the acquisition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub title: String,
    pub value: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn stage_of(name: Option<String>) -> Option<Stage> {
    name.as_deref().and_then(Stage::parse)
}

impl Resource for Opportunity {
    const TABLE: &'static str = "opportunities";
    const SINGULAR: &'static str = "opportunity";
    const PLURAL: &'static str = "opportunities";
    const LABEL: &'static str = "Opportunity";
    const NATURAL_KEY: &'static str = "title";

    fn from_payload(payload: &Value) -> DomainResult<Self> {
        let fields = as_object(payload)?;
        let mut v = Validator::new(fields);

        let title = v.required_string("title", TITLE_REQUIRED);
        let value = v.required_number("value", VALUE_NUMBER, Some((0.0, VALUE_POSITIVE)));
        let stage = v.optional_enum("stage", &Stage::NAMES, INVALID_STAGE);
        let notes = v.optional_string("notes");
        v.finish()?;

        Ok(Self {
            title,
            value,
            stage: stage_of(stage),
            notes,
        })
    }

    fn natural_key(&self) -> &str {
        &self.title
    }

    const PATCHABLE: bool = true;

    fn validate_patch(fields: &Row) -> DomainResult<Row> {
        validate_patch(fields)
    }
}

fn validate_patch(fields: &Row) -> DomainResult<Row> {
    let mut v = Validator::new(fields);
    let mut changes = Row::new();

    if !["title", "value", "stage", "notes"].iter().any(|f| v.has(f)) {
        return Err(DomainError::validation("No fields to update"));
    }

    if let Some(title) = v.optional_nonempty_string("title", TITLE_REQUIRED) {
        changes.insert("title".into(), Value::String(title));
    }
    if let Some(value) = v.optional_number("value", VALUE_NUMBER, Some((0.0, VALUE_POSITIVE))) {
        changes.insert("value".into(), Value::Number(value));
    }
    if let Some(stage) = v.optional_enum("stage", &Stage::NAMES, INVALID_STAGE) {
        changes.insert("stage".into(), Value::String(stage));
    }
    if let Some(notes) = v.optional_string("notes") {
        changes.insert("notes".into(), Value::String(notes));
    }

    v.finish()?;
    Ok(changes)
}
