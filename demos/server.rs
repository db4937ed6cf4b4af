//! Example server: loads config from env (or `SERVICE_CONFIG`), connects the configured
//! datastore, and serves collection CRUD routes until ctrl-c.

use datasource_sdk::{connect, load_from_env, service_router, validate, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("datasource_sdk=info".parse()?))
        .init();

    let config = load_from_env()?;
    validate(&config)?;

    let store = connect(&config.datasource).await?;
    let state = AppState::new(store.clone(), &config)?;
    let app = service_router(state, &config);

    let listener = TcpListener::bind(("0.0.0.0", config.server_port)).await?;
    tracing::info!(
        datasource = config.datasource.kind(),
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    store.close().await;
    tracing::info!("shut down");
    Ok(())
}
