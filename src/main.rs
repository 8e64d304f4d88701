//! Tweetline server

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tweetline::{AppState, config};

/// `RUST_LOG` wins over `logging.level`
fn init_tracing(logging: &config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("tweetline={},tower_http=debug", logging.level))
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        database = %config.database.path.display(),
        display_offset = %config.timeline.display_offset,
        "Starting Tweetline"
    );

    tweetline::metrics::init_metrics();

    let state = AppState::new(config.clone()).await?;
    let app = tweetline::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, public_url = %config.server.base_url(), "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
