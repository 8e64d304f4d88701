//! Configuration
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. `config/default.toml`, then `config/local.toml` (both optional)
//! 3. `TWEETLINE__SECTION__KEY` environment variables

use chrono::FixedOffset;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

use crate::error::AppError;

const ENV_PREFIX: &str = "TWEETLINE";
const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub timeline: TimelineConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener and public address
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub host: String,
    pub port: u16,
    /// Public host name; used for the CORS origin
    pub domain: String,
    /// "http" or "https"
    pub protocol: String,
}

impl ServerConfig {
    /// Public origin, e.g. "https://tweetline.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    fn is_https(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("https")
    }

    /// Whether `domain` names this machine (localhost or a loopback IP)
    fn is_local(&self) -> bool {
        let host = host_of(&self.domain);
        if host == "localhost" || host.ends_with(".localhost") {
            return true;
        }
        host.parse::<IpAddr>()
            .map(|ip| ip.is_loopback() || ip.is_unspecified())
            .unwrap_or(false)
    }
}

/// Document store location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, created on first start
    pub path: PathBuf,
}

/// Session token verification
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key shared with whoever issues sessions
    pub session_secret: String,
    /// Lifetime of newly issued sessions, in seconds
    pub session_max_age: i64,
}

/// Timeline presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// UTC offset used for `create_date_display` (default: "+09:00")
    pub display_offset: String,
    /// chrono format string for `create_date_display`
    pub display_format: String,
}

impl TimelineConfig {
    /// Parse `display_offset` ("+09:00", "-05:30", "Z")
    pub fn offset(&self) -> Result<FixedOffset, AppError> {
        parse_utc_offset(&self.display_offset).ok_or_else(|| {
            AppError::Config(format!(
                "timeline.display_offset is not a valid UTC offset: {}",
                self.display_offset
            ))
        })
    }

    fn check(&self) -> Result<(), AppError> {
        self.offset()?;

        let broken = StrftimeItems::new(&self.display_format).any(|item| matches!(item, Item::Error));
        if broken {
            return Err(AppError::Config(format!(
                "timeline.display_format is not a valid format string: {}",
                self.display_format
            )));
        }
        Ok(())
    }
}

/// Log output
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load and validate configuration
    ///
    /// # Errors
    /// `Config` if a source cannot be read or the merged result is invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let merged = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/tweetline.db")?
            .set_default("auth.session_max_age", 604_800)?
            .set_default("timeline.display_offset", "+09:00")?
            .set_default("timeline.display_format", "%H:%M · %Y년 %m월 %d일")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = merged.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {MIN_SESSION_SECRET_BYTES} bytes"
            )));
        }
        if self.auth.session_max_age <= 0 {
            return Err(AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        self.timeline.check()?;

        match (self.server.is_https(), self.server.is_local()) {
            (true, _) => {}
            (false, true) => tracing::warn!(
                domain = %self.server.domain,
                "Serving plain http; only acceptable for local development"
            ),
            (false, false) => {
                return Err(AppError::Config(
                    "server.protocol must be https for non-local server domains".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// `Z`/`UTC`, or a signed `HH:MM` offset as chrono parses it
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    raw.parse::<FixedOffset>().ok()
}

/// Lower-cased host part of a configured domain (port and trailing dot removed)
fn host_of(domain: &str) -> String {
    let trimmed = domain.trim();
    let host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}
