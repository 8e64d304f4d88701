//! Timeline reading endpoints
//!
//! Every handler here is fail-soft: any error, including `NotFound` and a
//! missing session, is logged and answered with `200 []`.

use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    routing::get,
};

use crate::AppState;
use crate::api::{tweet_views_to_response, user_timeline_to_response};
use crate::auth::MaybeUser;
use crate::error::AppError;
use crate::metrics::{
    ERRORS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, TIMELINE_FAIL_SOFT_TOTAL,
};
use crate::service::TimelineService;

const USER_TIMELINE_ENDPOINT: &str = "/api/reading/users/:user_id";
const LIKE_TIMELINE_ENDPOINT: &str = "/api/reading/users/:user_id/likes";
const HOME_TIMELINE_ENDPOINT: &str = "/api/reading/home";

/// Create reading router
pub fn reading_router() -> Router<AppState> {
    Router::new()
        .route("/reading/home", get(home_timeline))
        .route("/reading/users/:user_id", get(user_timeline))
        .route("/reading/users/:user_id/likes", get(user_like_timeline))
}

/// GET /api/reading/users/:user_id
pub async fn user_timeline(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", USER_TIMELINE_ENDPOINT])
        .start_timer();
    tracing::debug!(%user_id, "Reading user timeline");

    let service = TimelineService::new(state.db.clone());
    match service.user_timeline(&user_id).await {
        Ok(timeline) => {
            record_ok(USER_TIMELINE_ENDPOINT);
            Json(user_timeline_to_response(&timeline, &state.clock)).into_response()
        }
        Err(error) => fail_soft("user", USER_TIMELINE_ENDPOINT, error),
    }
}

/// GET /api/reading/users/:user_id/likes
pub async fn user_like_timeline(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", LIKE_TIMELINE_ENDPOINT])
        .start_timer();
    tracing::debug!(%user_id, "Reading like timeline");

    let service = TimelineService::new(state.db.clone());
    match service.user_like_timeline(&user_id).await {
        Ok(rows) => {
            record_ok(LIKE_TIMELINE_ENDPOINT);
            Json(tweet_views_to_response(&rows, &state.clock)).into_response()
        }
        Err(error) => fail_soft("likes", LIKE_TIMELINE_ENDPOINT, error),
    }
}

/// GET /api/reading/home
///
/// Scoped by the session's `user_id` and `following`.
pub async fn home_timeline(State(state): State<AppState>, MaybeUser(session): MaybeUser) -> Response {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", HOME_TIMELINE_ENDPOINT])
        .start_timer();

    let session = match session {
        Ok(session) => session,
        Err(error) => return fail_soft("home", HOME_TIMELINE_ENDPOINT, error),
    };
    tracing::debug!(
        user_id = %session.user_id,
        following = session.following.len(),
        "Reading home timeline"
    );

    let service = TimelineService::new(state.db.clone());
    match service
        .home_timeline(&session.user_id, &session.following)
        .await
    {
        Ok(rows) => {
            record_ok(HOME_TIMELINE_ENDPOINT);
            Json(tweet_views_to_response(&rows, &state.clock)).into_response()
        }
        Err(error) => fail_soft("home", HOME_TIMELINE_ENDPOINT, error),
    }
}

fn record_ok(endpoint: &str) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", endpoint, "200"])
        .inc();
}

/// Log `error` and answer with an empty list
fn fail_soft(view: &str, endpoint: &str, error: AppError) -> Response {
    match &error {
        AppError::NotFound(message) => {
            tracing::info!(view, %message, "Timeline empty; answering with an empty list");
        }
        _ => {
            tracing::error!(view, %error, "Timeline request failed; answering with an empty list");
        }
    }

    TIMELINE_FAIL_SOFT_TOTAL
        .with_label_values(&[view, error.kind()])
        .inc();
    ERRORS_TOTAL
        .with_label_values(&[error.kind(), endpoint])
        .inc();
    record_ok(endpoint);

    Json(Vec::<serde_json::Value>::new()).into_response()
}
