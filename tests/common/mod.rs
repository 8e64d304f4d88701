//! Common test utilities for E2E tests

#![allow(dead_code)]

pub mod schema_validator;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tweetline::data::{LikeEntry, Tweet, TweetEntry, User};
use tweetline::{AppState, config};

pub const TEST_SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        tweetline::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: TEST_SESSION_SECRET.to_string(),
                session_max_age: 604800,
            },
            timeline: config::TimelineConfig {
                display_offset: "+09:00".to_string(),
                display_format: "%H:%M · %Y년 %m월 %d일".to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tweetline::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET `path` and decode the JSON body, asserting `200`
    pub async fn get_json(&self, path: &str, token: Option<&str>) -> serde_json::Value {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 200, "GET {path}");
        response.json().await.unwrap()
    }

    /// Create a user document
    pub async fn create_user(&self, user_id: &str, follower: &[&str], following: &[&str]) -> User {
        let user = User {
            user_id: user_id.to_string(),
            name: format!("{} name", user_id),
            profile_color: "#1da1f2".to_string(),
            description: format!("{} bio", user_id),
            follower: follower.iter().map(|s| s.to_string()).collect(),
            following: following.iter().map(|s| s.to_string()).collect(),
        };
        self.state.db.upsert_user(&user).await.unwrap();
        user
    }

    /// Create a tweet document authored by `author`
    pub async fn create_tweet(&self, tweet_id: &str, author: &str) -> Tweet {
        let tweet = Tweet {
            tweet_id: tweet_id.to_string(),
            user_id: author.to_string(),
            contents: format!("{} says hi", author),
            image: None,
            video: None,
            create_date: at(1),
            retweet: vec![],
            like: vec![],
            comments: vec![],
            is_active: true,
        };
        self.state.db.upsert_tweet(&tweet).await.unwrap();
        tweet
    }

    /// Append a `tweet_list` item to `owner`'s timeline
    pub async fn add_to_timeline(&self, owner: &str, tweet_id: &str, is_retweet: bool, day: u32) {
        let entry = TweetEntry {
            tweet_id: tweet_id.to_string(),
            is_retweet,
            register_date: at(day),
        };
        self.state
            .db
            .append_timeline_tweet(owner, &entry)
            .await
            .unwrap();
    }

    /// Append a `like_list` item to `owner`'s timeline
    pub async fn add_like(&self, owner: &str, tweet_id: &str, day: u32) {
        let entry = LikeEntry {
            tweet_id: tweet_id.to_string(),
            register_date: at(day),
        };
        self.state
            .db
            .append_timeline_like(owner, &entry)
            .await
            .unwrap();
    }

    /// Issue a session token for `user_id` the way a login would
    pub fn create_test_token(&self, user_id: &str, following: &[&str]) -> String {
        use tweetline::auth::{Session, create_session_token};

        let auth = &self.state.config.auth;
        let session = Session::issue(
            user_id,
            following.iter().map(|s| s.to_string()).collect(),
            auth,
        );

        create_session_token(&session, &auth.session_secret).expect("Failed to create test token")
    }
}

/// Noon UTC on the given day of March 2024
pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}
