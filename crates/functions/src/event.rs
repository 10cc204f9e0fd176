//! Normalized representation of one inbound HTTP request.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Methods a function can be invoked with. Anything else is rejected by the
/// dispatcher before a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(UnsupportedMethod(other.to_string())),
        }
    }
}

/// One inbound request as seen by a handler.
///
/// Header names are stored lower-cased; repeated headers are joined with
/// `", "`. The body is the raw text (`None` when the request had none).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    http_method: HttpMethod,
    path: String,
    headers: BTreeMap<String, String>,
    query_string_parameters: HashMap<String, String>,
    raw_query: Option<String>,
    body: Option<String>,
}

impl InvocationEvent {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method: method,
            path: path.into(),
            headers: BTreeMap::new(),
            query_string_parameters: HashMap::new(),
            raw_query: None,
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
        self
    }

    /// Attach the raw query string and its decoded parameters.
    pub fn with_query(mut self, raw: Option<String>, params: HashMap<String, String>) -> Self {
        self.raw_query = raw.filter(|q| !q.is_empty());
        self.query_string_parameters = params;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query_string_parameters
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters.get(name).map(String::as_str)
    }

    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Parse the body as JSON; a missing body parses as `{}`.
    pub fn json_body(&self) -> serde_json::Result<Value> {
        serde_json::from_str(self.body.as_deref().unwrap_or("{}"))
    }
}

/// Per-invocation metadata handed to every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub function_name: String,
    pub request_id: Uuid,
}

impl InvocationContext {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            request_id: Uuid::now_v7(),
        }
    }
}
