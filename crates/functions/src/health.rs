use serde::Serialize;
use serde_json::json;

use dealflow_core::time::now_iso;

use crate::{FunctionHandler, HandlerOutput, InvocationContext, InvocationEvent, InvocationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Degraded,
}

impl CheckStatus {
    fn configured(yes: bool) -> Self {
        if yes { Self::Healthy } else { Self::Degraded }
    }
}

/// What the process knows about its collaborators at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSettings {
    pub version: String,
    pub environment: String,
    /// A real database is configured (not the in-memory store).
    pub database: bool,
    pub workflow: bool,
    pub hubspot: bool,
}

/// Reports version, environment and per-collaborator status.
#[derive(Debug, Clone)]
pub struct HealthHandler {
    settings: HealthSettings,
}

impl HealthHandler {
    pub fn new(settings: HealthSettings) -> Self {
        Self { settings }
    }

    pub fn report(&self) -> InvocationResult {
        let s = &self.settings;
        let checks = [
            ("database", CheckStatus::configured(s.database)),
            ("workflow", CheckStatus::configured(s.workflow)),
            ("hubspot", CheckStatus::configured(s.hubspot)),
        ];
        let overall = if checks.iter().all(|(_, c)| *c == CheckStatus::Healthy) {
            CheckStatus::Healthy
        } else {
            CheckStatus::Degraded
        };
        let degraded = checks.iter().filter(|(_, c)| *c == CheckStatus::Degraded).count();

        let mut check_map = serde_json::Map::new();
        for (name, status) in checks {
            check_map.insert(name.to_string(), json!({ "status": status }));
        }

        InvocationResult::json(
            200,
            json!({
                "status": overall,
                "timestamp": now_iso(),
                "version": s.version,
                "environment": s.environment,
                "checks": check_map,
                "metadata": {
                    "total_services": checks.len(),
                    "degraded_services": degraded,
                },
            }),
        )
        .with_header("Cache-Control", "no-cache, no-store, must-revalidate")
    }
}

#[async_trait::async_trait]
impl FunctionHandler for HealthHandler {
    async fn call(&self, _event: InvocationEvent, _ctx: InvocationContext) -> anyhow::Result<HandlerOutput> {
        Ok(HandlerOutput::Response(self.report()))
    }
}
