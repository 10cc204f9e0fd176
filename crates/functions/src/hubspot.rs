use chrono::Utc;

use dealflow_core::{SignedRequest, signature::verify_v3};

use crate::{FunctionHandler, HandlerOutput, InvocationContext, InvocationEvent, InvocationResult};

pub const SIGNATURE_HEADER: &str = "x-hubspot-signature-v3";
pub const TIMESTAMP_HEADER: &str = "x-hubspot-request-timestamp";

/// Verifies HubSpot v3 request signatures on inbound webhooks.
#[derive(Debug, Clone)]
pub struct HubspotWebhookHandler {
    secret: Option<String>,
}

impl HubspotWebhookHandler {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// The URI HubSpot signed: scheme and host as the client saw them.
    pub fn signed_uri(event: &InvocationEvent) -> String {
        let proto = event
            .header("x-forwarded-proto")
            .and_then(|p| p.split(',').next())
            .map(str::trim)
            .unwrap_or("http");
        let host = event.header("host").unwrap_or("localhost");
        match event.raw_query() {
            Some(query) => format!("{proto}://{host}{}?{query}", event.path()),
            None => format!("{proto}://{host}{}", event.path()),
        }
    }

    pub fn verify(&self, event: &InvocationEvent, now_ms: i64) -> InvocationResult {
        let Some(secret) = &self.secret else {
            tracing::warn!("hubspot webhook called but no client secret is configured");
            return InvocationResult::error(503, "webhook secret not configured");
        };

        let uri = Self::signed_uri(event);
        let request = SignedRequest {
            method: event.method().as_str(),
            uri: &uri,
            body: event.body().unwrap_or_default(),
            timestamp: event.header(TIMESTAMP_HEADER).unwrap_or_default(),
        };

        match verify_v3(secret.as_bytes(), &request, event.header(SIGNATURE_HEADER), now_ms) {
            Ok(()) => {
                tracing::info!(uri = %uri, "hubspot webhook accepted");
                InvocationResult::empty(204)
            }
            Err(err) => {
                tracing::warn!(uri = %uri, error = %err, "hubspot webhook rejected");
                InvocationResult::error(401, "invalid_signature")
            }
        }
    }
}

#[async_trait::async_trait]
impl FunctionHandler for HubspotWebhookHandler {
    async fn call(&self, event: InvocationEvent, _ctx: InvocationContext) -> anyhow::Result<HandlerOutput> {
        Ok(HandlerOutput::Response(self.verify(&event, Utc::now().timestamp_millis())))
    }
}
