//! Timeline aggregation
//!
//! The read pipeline behind every timeline view:
//!
//! ```text
//! scope filter -> flatten -> tweet join -> author join -> dedupe -> sort
//! ```
//!
//! The first two stages run in the store (see
//! [`Database::get_timeline_tweet_refs`](crate::data::Database::get_timeline_tweet_refs)).
//! The remaining stages are pure functions over what the store returned, so
//! each one can be tested in isolation and the three views only differ in
//! their [`Scope`] and [`ListSource`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::data::{TimelineRef, Tweet, User};

/// Which list of a timeline document feeds the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// `tweet_list`: authored tweets and retweets
    Tweets,
    /// `like_list`: liked tweets
    Likes,
}

impl ListSource {
    /// Whether rows are collapsed to one per `tweet_id`
    ///
    /// A `tweet_list` can reference the same tweet twice (authored and
    /// retweeted); a user likes a tweet at most once.
    pub fn dedupes(self) -> bool {
        matches!(self, ListSource::Tweets)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListSource::Tweets => "tweets",
            ListSource::Likes => "likes",
        }
    }
}

/// Ordered, duplicate-free set of timeline owners
///
/// The order is the pipeline order: rows of earlier owners are seen first,
/// which decides which row survives deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope(Vec<String>);

impl Scope {
    /// A single user's own timeline
    pub fn user(user_id: &str) -> Self {
        Self(vec![user_id.to_string()])
    }

    /// Home feed: everyone followed, then the user
    pub fn home(user_id: &str, following: &[String]) -> Self {
        Self(unique_in_order(
            following
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(user_id)),
        ))
    }

    pub fn owners(&self) -> &[String] {
        &self.0
    }
}

/// Author summary attached to every row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: String,
    pub name: String,
    pub profile_color: String,
    pub description: String,
    pub follower: Vec<String>,
    pub following: Vec<String>,
    pub follower_count: usize,
    pub following_count: usize,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            profile_color: user.profile_color.clone(),
            description: user.description.clone(),
            follower: user.follower.clone(),
            following: user.following.clone(),
            follower_count: user.follower_count(),
            following_count: user.following_count(),
        }
    }
}

/// A flattened list item joined with its tweet (stage 3 output)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTweet {
    /// Owner of the timeline the item came from
    pub user_id: String,
    pub is_retweet: bool,
    pub register_date: DateTime<Utc>,
    pub tweet: Tweet,
}

/// Denormalized timeline row: list item + tweet + author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetView {
    /// Owner of the timeline the row came from
    pub user_id: String,
    /// Author of the tweet
    pub writer_id: String,
    pub tweet_id: String,
    pub video: Option<String>,
    pub image: Option<String>,
    pub contents: String,
    pub create_date: DateTime<Utc>,
    pub retweet: Vec<String>,
    pub retweet_count: usize,
    pub like: Vec<String>,
    pub like_count: usize,
    pub comments: Vec<String>,
    pub comments_count: usize,
    pub is_retweet: bool,
    pub register_date: DateTime<Utc>,
    pub user: UserSummary,
}

/// Distinct tweet ids referenced by `refs`, in first-seen order
pub fn referenced_tweet_ids(refs: &[TimelineRef]) -> Vec<String> {
    unique_in_order(refs.iter().map(|r| r.tweet_id.as_str()))
}

/// Distinct author ids of `rows`, in first-seen order
pub fn writer_ids(rows: &[JoinedTweet]) -> Vec<String> {
    unique_in_order(rows.iter().map(|row| row.tweet.user_id.as_str()))
}

/// Stage 3: inner join of list items with their tweets
///
/// Items whose tweet is not in `tweets` are dropped. Row order follows `refs`.
pub fn join_tweets(refs: Vec<TimelineRef>, tweets: Vec<Tweet>) -> Vec<JoinedTweet> {
    let by_id: HashMap<String, Tweet> = tweets
        .into_iter()
        .map(|tweet| (tweet.tweet_id.clone(), tweet))
        .collect();

    refs.into_iter()
        .filter_map(|item| {
            let tweet = by_id.get(&item.tweet_id)?.clone();
            Some(JoinedTweet {
                user_id: item.user_id,
                is_retweet: item.is_retweet,
                register_date: item.register_date,
                tweet,
            })
        })
        .collect()
}

/// Stage 4: inner join of tweet rows with their authors
///
/// Rows whose author is not in `authors` are dropped. Row order is kept.
pub fn join_authors(rows: Vec<JoinedTweet>, authors: Vec<User>) -> Vec<TweetView> {
    let by_id: HashMap<String, UserSummary> = authors
        .iter()
        .map(|user| (user.user_id.clone(), UserSummary::from(user)))
        .collect();

    rows.into_iter()
        .filter_map(|row| {
            let user = by_id.get(&row.tweet.user_id)?.clone();
            let tweet = row.tweet;
            Some(TweetView {
                user_id: row.user_id,
                retweet_count: tweet.retweet_count(),
                like_count: tweet.like_count(),
                comments_count: tweet.comments_count(),
                writer_id: tweet.user_id,
                tweet_id: tweet.tweet_id,
                video: tweet.video,
                image: tweet.image,
                contents: tweet.contents,
                create_date: tweet.create_date,
                retweet: tweet.retweet,
                like: tweet.like,
                comments: tweet.comments,
                is_retweet: row.is_retweet,
                register_date: row.register_date,
                user,
            })
        })
        .collect()
}

/// Stage 5: keep the first row seen for each `tweet_id`
pub fn dedupe_by_tweet(rows: Vec<TweetView>) -> Vec<TweetView> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.tweet_id.clone()))
        .collect()
}

/// Stage 6: newest `register_date` first
///
/// The sort is stable, so equal dates keep pipeline order.
pub fn sort_by_register_date(mut rows: Vec<TweetView>) -> Vec<TweetView> {
    rows.sort_by(|a, b| b.register_date.cmp(&a.register_date));
    rows
}

/// Stages 5 and 6 for a given source
pub fn finish(source: ListSource, rows: Vec<TweetView>) -> Vec<TweetView> {
    let rows = if source.dedupes() {
        dedupe_by_tweet(rows)
    } else {
        rows
    };
    sort_by_register_date(rows)
}

fn unique_in_order<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
