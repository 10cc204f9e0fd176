use std::sync::Arc;

use dealflow_crm::{Investor, Lead, Opportunity, Resource};
use dealflow_functions::{FunctionDeps, HandlerRegistry, HealthSettings, WorkflowNotifier, builtin_registry};
use dealflow_store::{InMemoryRowStore, RowStore};

use crate::config::Config;

/// In-memory store with the natural-key constraints the Postgres schema has.
pub fn in_memory_store() -> InMemoryRowStore {
    InMemoryRowStore::new()
        .with_unique(Lead::TABLE, Lead::NATURAL_KEY)
        .with_unique(Investor::TABLE, Investor::NATURAL_KEY)
        .with_unique(Opportunity::TABLE, Opportunity::NATURAL_KEY)
}

/// The store, and whether it is a real database.
async fn build_store(config: &Config) -> anyhow::Result<(Arc<dyn RowStore>, bool)> {
    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = dealflow_store::PostgresRowStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres row store");
            Ok((Arc::new(store), true))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!("DATABASE_URL is set but postgres support is not compiled in; using in-memory store");
            Ok((Arc::new(in_memory_store()), false))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Ok((Arc::new(in_memory_store()), false))
        }
    }
}

/// Wire the store, the workflow worker and every built-in function.
pub async fn build_services(config: &Config) -> anyhow::Result<HandlerRegistry> {
    let (store, database) = build_store(config).await?;

    let client = reqwest::Client::builder()
        .timeout(config.workflow_timeout)
        .build()?;
    let (notifier, _worker) = WorkflowNotifier::spawn_http(client, config.workflow_url.clone());

    let registry = builtin_registry(FunctionDeps {
        store,
        notifier,
        health: HealthSettings {
            version: config.app_version.clone(),
            environment: config.app_env.clone(),
            database,
            workflow: !config.workflow_url.is_empty(),
            hubspot: config.hubspot_client_secret.is_some(),
        },
        hubspot_secret: config.hubspot_client_secret.clone(),
    })?;
    Ok(registry)
}
