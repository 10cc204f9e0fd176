use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use tracing::Instrument;

use crate::context::RequestContext;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Attach a [`RequestContext`] and emit one log line per request, inside a
/// span carrying the request id (the dispatcher records the function name).
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::new();
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        function = tracing::field::Empty,
    );
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ctx);

    async move {
        let started = Instant::now();
        let response = next.run(req).await;
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request"
        );
        response
    }
    .instrument(span)
    .await
}

/// Permissive CORS on every response; `OPTIONS` is answered here with
/// `204` before any routing happens.
pub async fn cors(req: Request<Body>, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    for (name, value) in [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}
