use dealflow_api::{app, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dealflow_observability::init();

    let config = Config::from_env()?;
    let registry = app::services::build_services(&config).await?;
    for name in registry.names() {
        tracing::info!(function = name, "loaded function");
    }

    let app = app::build_app(registry, &config);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        prefix = %config.functions_prefix,
        "functions server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
