//! Fallback handler that routes `<prefix>/<name>` to a registered function.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Extension, Query, State},
    http::{HeaderName, HeaderValue, Request, StatusCode, header, request::Parts},
    response::Response,
};

use futures::FutureExt;

use dealflow_functions::{HandlerRegistry, HttpMethod, InvocationContext, InvocationEvent, InvocationResult, ResponseBody};

use crate::app::errors;
use crate::context::RequestContext;

#[derive(Clone)]
pub struct DispatchState {
    registry: Arc<HandlerRegistry>,
    prefix: Arc<str>,
    max_body_bytes: usize,
}

impl DispatchState {
    pub fn new(registry: HandlerRegistry, prefix: &str, max_body_bytes: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            prefix: prefix.trim_end_matches('/').into(),
            max_body_bytes,
        }
    }
}

/// The function name is everything after `<prefix>/`; `None` when the path
/// is outside the prefix.
pub fn function_name<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(prefix)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty())
}

pub async fn dispatch(
    State(state): State<DispatchState>,
    ctx: Option<Extension<RequestContext>>,
    req: Request<Body>,
) -> Response {
    let (parts, body) = req.into_parts();

    let Some(name) = function_name(&state.prefix, parts.uri.path()) else {
        return errors::not_found_text();
    };
    tracing::Span::current().record("function", name);
    let Some(handler) = state.registry.get(name) else {
        return errors::function_not_found();
    };
    let Ok(method) = parts.method.as_str().parse::<HttpMethod>() else {
        return errors::method_not_allowed();
    };

    // Fails on the size limit or a dropped connection; only the former has a
    // client left to answer.
    let Ok(bytes) = axum::body::to_bytes(body, state.max_body_bytes).await else {
        return errors::payload_too_large();
    };

    let event = build_event(method, &parts, bytes);
    let ctx = InvocationContext {
        function_name: name.to_string(),
        request_id: ctx.map(|Extension(c)| c.request_id()).unwrap_or_else(|| RequestContext::new().request_id()),
    };

    // A panicking handler still gets a 500 so the CORS layer can answer.
    match AssertUnwindSafe(handler.call(event, ctx)).catch_unwind().await {
        Ok(Ok(output)) => into_response(name, output.into_result()),
        Ok(Err(err)) => errors::handler_fault(name, &err),
        Err(payload) => {
            let err = anyhow::anyhow!("function panicked: {}", panic_message(payload.as_ref()));
            errors::handler_fault(name, &err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn build_event(method: HttpMethod, parts: &Parts, body: Bytes) -> InvocationEvent {
    let params = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(params)| params)
        .unwrap_or_default();

    let mut event = InvocationEvent::new(method, parts.uri.path())
        .with_query(parts.uri.query().map(str::to_string), params);
    for (name, value) in &parts.headers {
        event = event.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    if !body.is_empty() {
        event = event.with_body(String::from_utf8_lossy(&body));
    }
    event
}

/// Write a handler result to the wire. JSON is the default content type;
/// handler headers may override it.
fn into_response(function: &str, result: InvocationResult) -> Response {
    let status = StatusCode::from_u16(result.status_code).unwrap_or_else(|_| {
        tracing::warn!(function, status = result.status_code, "invalid status code from function");
        StatusCode::INTERNAL_SERVER_ERROR
    });
    let has_body = result.body != ResponseBody::Empty;

    let mut response = Response::new(Body::from(result.body.into_text()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    if has_body {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    for (name, value) in result.headers.unwrap_or_default() {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(function, header = %name, "dropping invalid response header"),
        }
    }
    response
}
