use anyhow::{Context, Result};
use kr_estate_backend::api;
use kr_estate_backend::clock::SeoulClock;
use kr_estate_backend::config::{Config, Credential};
use kr_estate_backend::state::AppState;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting KR estate API server");

    let config = Config::from_env()?;
    for credential in [Credential::DataGoKr, Credential::Neis, Credential::Rone] {
        if config.credential(credential).is_none() {
            warn!(
                "{} is not set; endpoints using it will answer 500",
                credential.env_var()
            );
        }
    }

    let addr = config.bind_addr;
    let state = AppState::new(config, Arc::new(SeoulClock))?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
