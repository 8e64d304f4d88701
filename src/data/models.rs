//! Data models
//!
//! Rust structs mirroring the three collections the timeline reads:
//! users, tweets and per-user timelines. Set-valued fields are kept as
//! ordered `Vec<String>` in the order the store returned them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// A user document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub profile_color: String,
    pub description: String,
    /// user_ids following this user
    pub follower: Vec<String>,
    /// user_ids this user follows
    pub following: Vec<String>,
}

impl User {
    pub fn follower_count(&self) -> usize {
        self.follower.len()
    }

    pub fn following_count(&self) -> usize {
        self.following.len()
    }
}

// =============================================================================
// Tweet
// =============================================================================

/// A tweet document
///
/// `is_active` is a soft-delete flag. Timeline reads project it but do not
/// filter on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: String,
    /// Author
    pub user_id: String,
    pub contents: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub create_date: DateTime<Utc>,
    /// user_ids who retweeted
    pub retweet: Vec<String>,
    /// user_ids who liked
    pub like: Vec<String>,
    /// Comment references in posting order
    pub comments: Vec<String>,
    pub is_active: bool,
}

impl Tweet {
    pub fn retweet_count(&self) -> usize {
        self.retweet.len()
    }

    pub fn like_count(&self) -> usize {
        self.like.len()
    }

    pub fn comments_count(&self) -> usize {
        self.comments.len()
    }
}

// =============================================================================
// Timeline
// =============================================================================

/// Item of a user's `tweet_list`
///
/// One is appended when the owner authors a tweet (`is_retweet = false`)
/// or retweets one (`is_retweet = true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetEntry {
    pub tweet_id: String,
    pub is_retweet: bool,
    pub register_date: DateTime<Utc>,
}

/// Item of a user's `like_list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeEntry {
    pub tweet_id: String,
    /// When the like was recorded
    pub register_date: DateTime<Utc>,
}

/// Per-user materialized index of tweet and like references
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLine {
    pub user_id: String,
    pub tweet_list: Vec<TweetEntry>,
    pub like_list: Vec<LikeEntry>,
}

/// One flattened list item, tagged with its owner
///
/// Produced by the store for the scope filter + flatten stages.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TimelineRef {
    /// Owner of the timeline the item came from
    pub user_id: String,
    pub tweet_id: String,
    pub is_retweet: bool,
    pub register_date: DateTime<Utc>,
}
