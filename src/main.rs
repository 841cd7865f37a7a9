use tracing_subscriber::EnvFilter;

use pim_catalog::config::Config;
use pim_catalog::{api_router, build_state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let state = build_state(&config).await?;
    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, media_root = %config.media_root.display(), "Catalog listening");
    axum::serve(listener, app).await?;
    Ok(())
}
