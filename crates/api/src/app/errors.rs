use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// `{"error": <message>}` with a JSON content type.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// Plain-text `404` for paths outside the functions prefix.
pub fn not_found_text() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not Found",
    )
        .into_response()
}

pub fn function_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Function not found")
}

pub fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

pub fn payload_too_large() -> Response {
    json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
}

/// A handler fault: `500` carrying the error's display text.
pub fn handler_fault(function: &str, err: &anyhow::Error) -> Response {
    tracing::error!(function, error = ?err, "function failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
