use std::collections::BTreeMap;

use serde_json::Value;

/// Response body as produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    /// Already-serialized text, written verbatim.
    Text(String),
    /// Structured value, serialized to JSON text by the dispatcher.
    Json(Value),
}

impl ResponseBody {
    pub fn into_text(self) -> String {
        match self {
            ResponseBody::Empty => String::new(),
            ResponseBody::Text(text) => text,
            ResponseBody::Json(value) => value.to_string(),
        }
    }
}

/// A complete response: status, body and optional extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: ResponseBody,
    pub headers: Option<BTreeMap<String, String>>,
}

impl InvocationResult {
    pub fn new(status_code: u16, body: ResponseBody) -> Self {
        Self {
            status_code,
            body,
            headers: None,
        }
    }

    pub fn json(status_code: u16, body: Value) -> Self {
        Self::new(status_code, ResponseBody::Json(body))
    }

    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        Self::new(status_code, ResponseBody::Text(body.into()))
    }

    pub fn empty(status_code: u16) -> Self {
        Self::new(status_code, ResponseBody::Empty)
    }

    /// `{"error": <message>}` with the given status.
    pub fn error(status_code: u16, message: impl Into<Value>) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("error".to_string(), message.into());
        Self::json(status_code, Value::Object(body))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// What a handler hands back to the dispatcher.
///
/// The variant says which shape was produced; nothing is inferred from the
/// contents of the value.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// A full response, forwarded as-is.
    Response(InvocationResult),
    /// A bare payload, wrapped as a `200` response.
    Payload(Value),
}

impl HandlerOutput {
    pub fn into_result(self) -> InvocationResult {
        match self {
            HandlerOutput::Response(result) => result,
            HandlerOutput::Payload(Value::String(text)) => InvocationResult::text(200, text),
            HandlerOutput::Payload(value) => InvocationResult::json(200, value),
        }
    }
}

impl From<InvocationResult> for HandlerOutput {
    fn from(result: InvocationResult) -> Self {
        HandlerOutput::Response(result)
    }
}
