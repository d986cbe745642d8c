//! smartlink-server - SmartLink HTTP entry point
//!
//! Resolves visitors of the entry file to their target URL and serves share
//! data for embedding pages.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("smartlink_server=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("smartlink-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = config::Config::load()?;
    config.sdk.validate()?;
    let bind = config.bind;
    if let Some(fixtures) = &config.fixtures {
        info!("Serving API responses from fixtures {}", fixtures.display());
    }

    let state = state::AppState::from_config(config)?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
