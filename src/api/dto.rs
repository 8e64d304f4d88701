//! Timeline response DTOs
//!
//! JSON shapes returned by the reading endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile summary of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummaryResponse {
    pub user_id: String,
    pub name: String,
    pub profile_color: String,
    pub description: String,
    pub follower: Vec<String>,
    pub following: Vec<String>,
    pub follower_count: usize,
    pub following_count: usize,
}

/// One timeline row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetViewResponse {
    /// Owner of the timeline the row came from
    pub user_id: String,
    /// Author of the tweet
    pub writer_id: String,
    pub tweet_id: String,
    pub video: Option<String>,
    pub image: Option<String>,
    pub contents: String,
    pub create_date: DateTime<Utc>,
    /// `create_date` rendered in the configured display offset
    pub create_date_display: String,
    pub retweet: Vec<String>,
    pub retweet_count: usize,
    pub like: Vec<String>,
    pub like_count: usize,
    pub comments: Vec<String>,
    pub comments_count: usize,
    pub is_retweet: bool,
    pub register_date: DateTime<Utc>,
    /// Author summary
    pub user: UserSummaryResponse,
}

/// Body of the own-timeline endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTimelineResponse {
    pub user: UserSummaryResponse,
    #[serde(rename = "timeLine")]
    pub time_line: Vec<TweetViewResponse>,
}
