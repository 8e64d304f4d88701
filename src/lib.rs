//! Tweetline: read side of a microblog
//!
//! Serves three timeline views over a document store of users, tweets and
//! per-user timeline lists:
//!
//! ```text
//! GET /api/reading/users/:id        own tweets and retweets + profile
//! GET /api/reading/users/:id/likes  liked tweets
//! GET /api/reading/home             session user + everyone they follow
//! ```
//!
//! `api` adapts HTTP to `service`, which runs the aggregation pipeline over
//! what `data` returns. `auth` verifies the signed sessions issued
//! elsewhere.

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

use axum::{Router, http::HeaderValue, middleware, routing::get};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared per-process resources, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub db: Arc<data::Database>,
    /// Renders `create_date_display`
    pub clock: Arc<api::DisplayClock>,
}

impl AppState {
    /// Open the store and prepare timestamp rendering
    ///
    /// # Errors
    /// `Config` for an unusable display offset; `Database` or `Internal`
    /// if the store cannot be opened or migrated
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let clock = api::DisplayClock {
            offset: config.timeline.offset()?,
            format: config.timeline.display_format.clone(),
        };
        let db = data::Database::connect(&config.database.path).await?;

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            clock: Arc::new(clock),
        })
    }
}

/// Full route table, used by the binary and by the e2e tests
///
/// - `GET /health`
/// - `GET /api/reading/...` (fail-soft timeline views)
/// - `GET /metrics` (session required)
pub fn build_router(state: AppState) -> Router {
    let metrics = api::metrics_router::<AppState>().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api::reading_router())
        .merge(metrics)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config.server))
        .with_state(state)
}

/// Plain-http deployments are local and get a permissive policy; otherwise
/// only the public origin may call in.
fn cors(server: &config::ServerConfig) -> CorsLayer {
    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let origin = server.base_url();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(&origin) {
        Ok(value) => layer.allow_origin([value]),
        Err(error) => {
            tracing::error!(%error, %origin, "Public origin is not a valid header value; CORS disabled");
            layer
        }
    }
}
