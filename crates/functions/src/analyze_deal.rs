use chrono::Utc;
use serde_json::{Value, json};

use dealflow_core::DomainError;
use dealflow_crm::{analyze, normalize_deal_input};

use crate::{FunctionHandler, HandlerOutput, HttpMethod, InvocationContext, InvocationEvent, InvocationResult};

/// Rental deal analysis over camelCase or snake_case input.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeDealHandler;

impl AnalyzeDealHandler {
    pub fn analyze(&self, event: &InvocationEvent) -> anyhow::Result<InvocationResult> {
        if event.method() != HttpMethod::Post {
            return Ok(InvocationResult::error(405, "Method not allowed"));
        }
        tracing::debug!(body = event.body().unwrap_or_default(), "deal analysis requested");

        let Ok(payload) = event.json_body() else {
            return Ok(InvocationResult::error(400, "Invalid JSON body"));
        };
        let input = match normalize_deal_input(&payload) {
            Ok(input) => input,
            Err(err) => {
                tracing::info!(error = %err, "deal input rejected");
                return Ok(rejected(err));
            }
        };

        let analysis = analyze(input, Utc::now());
        Ok(InvocationResult::json(200, serde_json::to_value(&analysis)?))
    }
}

fn rejected(err: DomainError) -> InvocationResult {
    let issues: Vec<Value> = err.messages().into_iter().map(Value::String).collect();
    InvocationResult::json(400, json!({ "error": "Invalid deal input", "issues": issues }))
}

#[async_trait::async_trait]
impl FunctionHandler for AnalyzeDealHandler {
    async fn call(&self, event: InvocationEvent, _ctx: InvocationContext) -> anyhow::Result<HandlerOutput> {
        self.analyze(&event).map(HandlerOutput::Response)
    }
}
