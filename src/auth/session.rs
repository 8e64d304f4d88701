//! Signed session tokens
//!
//! A token is `base64url(json payload) "." base64url(HMAC-SHA256(payload part))`.
//! Nothing is stored server-side; whoever holds the secret can issue one.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Identity carried by a session
///
/// `following` is the follow set at issue time; the home timeline is scoped
/// by it rather than by a fresh lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session starting now and lasting `max_age_seconds`
    pub fn new(user_id: impl Into<String>, following: Vec<String>, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            following,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Session lasting the configured `auth.session_max_age`
    pub fn issue(user_id: impl Into<String>, following: Vec<String>, auth: &AuthConfig) -> Self {
        Self::new(user_id, following, auth.session_max_age)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn mac(secret: &str, payload_part: &str) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_part.as_bytes());
    Ok(mac)
}

/// Sign `session` with `secret`
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_vec(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload);
    let signature = mac(secret, &payload_part)?.finalize().into_bytes();

    Ok(format!("{payload_part}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Check the signature of `token` and decode its session
///
/// # Errors
/// - `InvalidSignature` if the MAC does not match
/// - `Unauthorized` if the token is malformed or the session expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload_part, signature_part) = token
        .split_once('.')
        .filter(|(_, signature)| !signature.contains('.'))
        .ok_or(AppError::Unauthorized)?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_part)
        .map_err(|_| AppError::Unauthorized)?;
    mac(secret, payload_part)?
        .verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| AppError::Unauthorized)?;
    let session: Session = serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }
    Ok(session)
}
