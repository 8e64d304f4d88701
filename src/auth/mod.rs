//! Session authentication
//!
//! Handles:
//! - Signed session tokens
//! - Authentication middleware and extractors

mod middleware;
pub mod session;

pub use middleware::{MaybeUser, require_auth};
pub use session::{Session, create_session_token, verify_session_token};
