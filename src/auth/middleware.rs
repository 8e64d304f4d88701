//! Session resolution for requests
//!
//! A token is read from `Authorization: Bearer` first, then from the
//! `session` cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

/// Cookie holding the signed session token
pub const SESSION_COOKIE: &str = "session";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn resolve_session(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = bearer_token(headers)
        .or_else(|| cookie_token(headers))
        .ok_or(AppError::Unauthorized)?;
    verify_session_token(&token, &state.config.auth.session_secret)
}

/// Reject requests without a valid session (401)
///
/// The session is stored in the request extensions for later extractors.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = resolve_session(request.headers(), &state)?;
    tracing::debug!(user_id = %session.user_id, "Session accepted");
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// The request's session, or why there is none
///
/// Never rejects; fail-soft handlers decide what to do with the error.
#[derive(Debug)]
pub struct MaybeUser(pub Result<Session, AppError>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolved = match parts.extensions.get::<Session>() {
            Some(session) => Ok(session.clone()),
            None => resolve_session(&parts.headers, &AppState::from_ref(state)),
        };
        Ok(MaybeUser(resolved))
    }
}
