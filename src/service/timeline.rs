//! Timeline service
//!
//! Runs the aggregation pipeline for the three timeline views and turns
//! empty results into `NotFound`.

use std::sync::Arc;

use super::aggregate::{self, ListSource, Scope, TweetView, UserSummary};
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::TIMELINE_ROWS;

const EMPTY_TIMELINE: &str = "timeline is empty";
const EMPTY_HOME_TIMELINE: &str = "home timeline has no tweets";

/// A user's own timeline together with their profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTimeline {
    pub user: UserSummary,
    pub time_line: Vec<TweetView>,
}

/// Timeline service
pub struct TimelineService {
    db: Arc<Database>,
}

impl TimelineService {
    /// Create new timeline service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get a user's own timeline
    ///
    /// Authored tweets and retweets of `user_id`, one row per tweet,
    /// newest first, plus the user's profile summary.
    ///
    /// # Errors
    /// `NotFound` if the timeline is empty or the user does not exist
    pub async fn user_timeline(&self, user_id: &str) -> Result<UserTimeline, AppError> {
        let time_line = self
            .aggregate("user", &Scope::user(user_id), ListSource::Tweets)
            .await?;
        if time_line.is_empty() {
            return Err(AppError::NotFound(EMPTY_TIMELINE.to_string()));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

        Ok(UserTimeline {
            user: UserSummary::from(&user),
            time_line,
        })
    }

    /// Get the tweets a user liked
    ///
    /// Not deduplicated: a like list holds each tweet at most once.
    ///
    /// # Errors
    /// `NotFound` if the user liked nothing that still resolves
    pub async fn user_like_timeline(&self, user_id: &str) -> Result<Vec<TweetView>, AppError> {
        let rows = self
            .aggregate("likes", &Scope::user(user_id), ListSource::Likes)
            .await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(EMPTY_TIMELINE.to_string()));
        }
        Ok(rows)
    }

    /// Get the home feed
    ///
    /// Tweet lists of `user_id` and everyone in `following`, one row per
    /// tweet, newest first.
    ///
    /// # Errors
    /// `NotFound` if no tweet in scope resolves
    pub async fn home_timeline(
        &self,
        user_id: &str,
        following: &[String],
    ) -> Result<Vec<TweetView>, AppError> {
        let rows = self
            .aggregate("home", &Scope::home(user_id, following), ListSource::Tweets)
            .await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(EMPTY_HOME_TIMELINE.to_string()));
        }
        Ok(rows)
    }

    async fn aggregate(
        &self,
        view: &'static str,
        scope: &Scope,
        source: ListSource,
    ) -> Result<Vec<TweetView>, AppError> {
        let refs = match source {
            ListSource::Tweets => self.db.get_timeline_tweet_refs(scope.owners()).await?,
            ListSource::Likes => self.db.get_timeline_like_refs(scope.owners()).await?,
        };
        let flattened = refs.len();

        let tweets = self
            .db
            .get_tweets_by_ids(&aggregate::referenced_tweet_ids(&refs))
            .await?;
        let joined = aggregate::join_tweets(refs, tweets);

        let authors = self
            .db
            .get_users_by_ids(&aggregate::writer_ids(&joined))
            .await?;
        let rows = aggregate::finish(source, aggregate::join_authors(joined, authors));

        tracing::debug!(
            view,
            source = source.as_str(),
            owners = scope.owners().len(),
            flattened,
            rows = rows.len(),
            "Timeline aggregated"
        );
        TIMELINE_ROWS
            .with_label_values(&[view])
            .observe(rows.len() as f64);

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LikeEntry, Tweet, TweetEntry, User};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    async fn service() -> (TimelineService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("timeline.db"))
                .await
                .unwrap(),
        );
        (TimelineService::new(db.clone()), db, temp_dir)
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, day, 9, 0, 0).unwrap()
    }

    async fn add_user(db: &Database, user_id: &str, follower: &[&str]) {
        db.upsert_user(&User {
            user_id: user_id.to_string(),
            name: user_id.to_string(),
            profile_color: "#794bc4".to_string(),
            description: String::new(),
            follower: follower.iter().map(|s| s.to_string()).collect(),
            following: vec![],
        })
        .await
        .unwrap();
    }

    async fn add_tweet(db: &Database, tweet_id: &str, author: &str) {
        db.upsert_tweet(&Tweet {
            tweet_id: tweet_id.to_string(),
            user_id: author.to_string(),
            contents: format!("{tweet_id} by {author}"),
            image: None,
            video: None,
            create_date: at(1),
            retweet: vec![],
            like: vec![],
            comments: vec![],
            is_active: true,
        })
        .await
        .unwrap();
    }

    async fn post(db: &Database, owner: &str, tweet_id: &str, is_retweet: bool, day: u32) {
        db.append_timeline_tweet(
            owner,
            &TweetEntry {
                tweet_id: tweet_id.to_string(),
                is_retweet,
                register_date: at(day),
            },
        )
        .await
        .unwrap();
    }

    fn ids(rows: &[TweetView]) -> Vec<&str> {
        rows.iter().map(|r| r.tweet_id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_scope_is_not_found_for_every_view() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &[]).await;

        assert!(matches!(
            service.user_timeline("a").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.user_like_timeline("a").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.home_timeline("a", &["b".to_string()]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn user_timeline_collapses_retweet_of_own_tweet() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &["x", "y"]).await;
        add_tweet(&db, "t1", "a").await;
        post(&db, "a", "t1", false, 1).await;
        post(&db, "a", "t1", true, 2).await;

        let timeline = service.user_timeline("a").await.unwrap();
        assert_eq!(ids(&timeline.time_line), ["t1"]);
        assert!(!timeline.time_line[0].is_retweet);
        assert_eq!(timeline.user.follower_count, 2);
        assert_eq!(timeline.time_line[0].user.follower_count, 2);
    }

    #[tokio::test]
    async fn unresolvable_entry_produces_no_row() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &[]).await;
        add_tweet(&db, "t1", "a").await;
        post(&db, "a", "t1", false, 1).await;
        post(&db, "a", "gone", false, 2).await;

        let timeline = service.user_timeline("a").await.unwrap();
        assert_eq!(ids(&timeline.time_line), ["t1"]);
    }

    #[tokio::test]
    async fn user_timeline_requires_existing_user() {
        let (service, db, _dir) = service().await;
        add_user(&db, "b", &[]).await;
        add_tweet(&db, "t1", "b").await;
        post(&db, "a", "t1", true, 1).await;

        let error = service.user_timeline("a").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound(message) if message == "user not found"));
    }

    #[tokio::test]
    async fn rows_come_back_newest_first() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &[]).await;
        for (tweet_id, day) in [("t1", 3), ("t2", 9), ("t3", 6)] {
            add_tweet(&db, tweet_id, "a").await;
            post(&db, "a", tweet_id, false, day).await;
        }

        let timeline = service.user_timeline("a").await.unwrap();
        assert_eq!(ids(&timeline.time_line), ["t2", "t3", "t1"]);
    }

    #[tokio::test]
    async fn home_timeline_stays_within_scope() {
        let (service, db, _dir) = service().await;
        for user in ["a", "b", "c", "d"] {
            add_user(&db, user, &[]).await;
            let tweet_id = format!("{user}-tweet");
            add_tweet(&db, &tweet_id, user).await;
            post(&db, user, &tweet_id, false, 1).await;
        }

        let rows = service
            .home_timeline("a", &["b".to_string(), "c".to_string()])
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| ["a", "b", "c"].contains(&r.user_id.as_str())));
        assert!(rows.iter().all(|r| r.user_id != "d"));
    }

    #[tokio::test]
    async fn home_timeline_handles_very_large_following() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &[]).await;
        add_tweet(&db, "t1", "a").await;
        post(&db, "a", "t1", false, 1).await;

        let following: Vec<String> = (0..20_000).map(|i| format!("f{i}")).collect();
        let rows = service.home_timeline("a", &following).await.unwrap();

        assert_eq!(ids(&rows), ["t1"]);
    }

    #[tokio::test]
    async fn home_timeline_shows_shared_tweet_once() {
        let (service, db, _dir) = service().await;
        add_user(&db, "a", &[]).await;
        add_user(&db, "b", &[]).await;
        add_tweet(&db, "t1", "b").await;
        post(&db, "b", "t1", false, 1).await;
        post(&db, "a", "t1", true, 2).await;

        let rows = service.home_timeline("a", &["b".to_string()]).await.unwrap();
        assert_eq!(ids(&rows), ["t1"]);
        // followed users come first in pipeline order
        assert_eq!(rows[0].user_id, "b");
        assert!(!rows[0].is_retweet);
    }

    #[tokio::test]
    async fn like_timeline_lists_liked_tweets() {
        let (service, db, _dir) = service().await;
        add_user(&db, "b", &[]).await;
        add_tweet(&db, "t1", "b").await;
        add_tweet(&db, "t2", "b").await;
        for (tweet_id, day) in [("t1", 4), ("t2", 8)] {
            db.append_timeline_like(
                "a",
                &LikeEntry {
                    tweet_id: tweet_id.to_string(),
                    register_date: at(day),
                },
            )
            .await
            .unwrap();
        }

        let rows = service.user_like_timeline("a").await.unwrap();
        assert_eq!(ids(&rows), ["t2", "t1"]);
        assert!(rows.iter().all(|r| r.writer_id == "b" && r.user_id == "a"));
    }
}
