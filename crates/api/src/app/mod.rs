//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, workflow worker and function registry
//! - `dispatch.rs`: `<prefix>/<name>` routing into the registry
//! - `errors.rs`: dispatcher-level error responses

use axum::{Router, middleware::from_fn};
use tower::ServiceBuilder;

use dealflow_functions::HandlerRegistry;

use crate::config::Config;
use crate::middleware;

pub mod dispatch;
pub mod errors;
pub mod services;

/// Build the full HTTP router around a function registry.
///
/// Every path goes through the dispatcher; there are no other routes.
pub fn build_app(registry: HandlerRegistry, config: &Config) -> Router {
    let state = dispatch::DispatchState::new(registry, &config.functions_prefix, config.max_body_bytes);

    Router::new()
        .fallback(dispatch::dispatch)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_context))
                .layer(from_fn(middleware::cors)),
        )
}
