//! Named functions behind the dispatcher.
//!
//! A function is a [`FunctionHandler`]: it receives one [`InvocationEvent`]
//! and produces a [`HandlerOutput`]. The set of functions is fixed at startup
//! in a [`HandlerRegistry`]; [`builtin_registry`] enumerates the CRM ones.

use std::sync::Arc;

use dealflow_crm::{Investor, Lead, Opportunity};
use dealflow_store::RowStore;

pub mod analyze_deal;
pub mod crud;
pub mod error;
pub mod event;
pub mod handler;
pub mod health;
pub mod hubspot;
pub mod notify;
pub mod registry;
pub mod response;

pub use analyze_deal::AnalyzeDealHandler;
pub use crud::CrudHandler;
pub use error::FunctionError;
pub use event::{HttpMethod, InvocationContext, InvocationEvent, UnsupportedMethod};
pub use handler::{FnHandler, FunctionHandler, handler_fn};
pub use health::{HealthHandler, HealthSettings};
pub use hubspot::HubspotWebhookHandler;
pub use notify::{WorkflowMessage, WorkflowNotifier};
pub use registry::{HandlerRegistry, RegistryError};
pub use response::{HandlerOutput, InvocationResult, ResponseBody};

/// Collaborators the built-in functions are wired with.
pub struct FunctionDeps {
    pub store: Arc<dyn RowStore>,
    pub notifier: WorkflowNotifier,
    pub health: HealthSettings,
    pub hubspot_secret: Option<String>,
}

/// Every built-in function, by the name it is invoked under.
pub fn builtin_functions(deps: FunctionDeps) -> Vec<(&'static str, Arc<dyn FunctionHandler>)> {
    let FunctionDeps {
        store,
        notifier,
        health,
        hubspot_secret,
    } = deps;

    vec![
        entry(
            "lead-ingest",
            CrudHandler::<Lead>::new(store.clone()).with_notifier(notifier),
        ),
        entry("investor", CrudHandler::<Investor>::new(store.clone())),
        entry("opportunity", CrudHandler::<Opportunity>::new(store)),
        entry("health", HealthHandler::new(health)),
        entry("analyze-deal", AnalyzeDealHandler),
        entry("hubspot-webhook", HubspotWebhookHandler::new(hubspot_secret)),
    ]
}

fn entry(
    name: &'static str,
    handler: impl FunctionHandler + 'static,
) -> (&'static str, Arc<dyn FunctionHandler>) {
    let handler: Arc<dyn FunctionHandler> = Arc::new(handler);
    (name, handler)
}

pub fn builtin_registry(deps: FunctionDeps) -> Result<HandlerRegistry, RegistryError> {
    HandlerRegistry::new(builtin_functions(deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_store::InMemoryRowStore;

    #[test]
    fn builtin_names() {
        let (notifier, _rx) = WorkflowNotifier::channel();
        let registry = builtin_registry(FunctionDeps {
            store: Arc::new(InMemoryRowStore::new()),
            notifier,
            health: HealthSettings {
                version: "0.1.0".into(),
                environment: "test".into(),
                database: false,
                workflow: true,
                hubspot: false,
            },
            hubspot_secret: None,
        })
        .unwrap();

        assert_eq!(
            registry.names(),
            ["analyze-deal", "health", "hubspot-webhook", "investor", "lead-ingest", "opportunity"]
        );
    }
}
