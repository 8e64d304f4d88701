//! SQLite database operations
//!
//! All store access goes through this module. The timeline core only reads;
//! the write methods exist for the collaborators that post, retweet and like
//! (and for tests that stand in for them).

use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::time::Instant;

use super::models::*;
use crate::error::AppError;
use crate::metrics::observe_db_query;

/// SQLite bind-parameter chunk size for `IN (...)` lookups
const IN_CHUNK_SIZE: usize = 100;

fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
        .unwrap_or_default()
}

fn encode_json_list(values: &[String]) -> Result<String, AppError> {
    serde_json::to_string(values).map_err(|e| AppError::Internal(e.into()))
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        profile_color: row.try_get("profile_color")?,
        description: row.try_get("description")?,
        follower: parse_json_list(row.try_get("follower")?),
        following: parse_json_list(row.try_get("following")?),
    })
}

fn tweet_from_row(row: &SqliteRow) -> Result<Tweet, sqlx::Error> {
    Ok(Tweet {
        tweet_id: row.try_get("tweet_id")?,
        user_id: row.try_get("user_id")?,
        contents: row.try_get("contents")?,
        image: row.try_get("image")?,
        video: row.try_get("video")?,
        create_date: row.try_get("create_date")?,
        retweet: parse_json_list(row.try_get("retweet")?),
        like: parse_json_list(row.try_get("like_list")?),
        comments: parse_json_list(row.try_get("comments")?),
        is_active: row.try_get("is_active")?,
    })
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let started = Instant::now();
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        observe_db_query("SELECT", "users", started.elapsed());

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    /// Get all users whose id is in `user_ids`
    ///
    /// Unknown ids are skipped. Result order is unspecified.
    pub async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let started = Instant::now();
        let mut users = Vec::new();
        for chunk in user_ids.chunks(IN_CHUNK_SIZE) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE user_id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for user_id in chunk {
                    separated.push_bind(user_id);
                }
            }
            query_builder.push(")");

            let rows = query_builder.build().fetch_all(&self.pool).await?;
            for row in &rows {
                users.push(user_from_row(row)?);
            }
        }
        observe_db_query("SELECT", "users", started.elapsed());

        Ok(users)
    }

    /// Insert or replace a user document
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let follower = encode_json_list(&user.follower)?;
        let following = encode_json_list(&user.following)?;

        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, profile_color, description, follower, following)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                profile_color = excluded.profile_color,
                description = excluded.description,
                follower = excluded.follower,
                following = excluded.following
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.profile_color)
        .bind(&user.description)
        .bind(follower)
        .bind(following)
        .execute(&self.pool)
        .await?;
        observe_db_query("UPSERT", "users", started.elapsed());

        Ok(())
    }

    // =========================================================================
    // Tweets
    // =========================================================================

    /// Get all tweets whose id is in `tweet_ids`
    ///
    /// Unknown ids are skipped. Result order is unspecified.
    pub async fn get_tweets_by_ids(&self, tweet_ids: &[String]) -> Result<Vec<Tweet>, AppError> {
        if tweet_ids.is_empty() {
            return Ok(vec![]);
        }

        let started = Instant::now();
        let mut tweets = Vec::new();
        for chunk in tweet_ids.chunks(IN_CHUNK_SIZE) {
            let mut query_builder =
                QueryBuilder::<Sqlite>::new("SELECT * FROM tweets WHERE tweet_id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for tweet_id in chunk {
                    separated.push_bind(tweet_id);
                }
            }
            query_builder.push(")");

            let rows = query_builder.build().fetch_all(&self.pool).await?;
            for row in &rows {
                tweets.push(tweet_from_row(row)?);
            }
        }
        observe_db_query("SELECT", "tweets", started.elapsed());

        Ok(tweets)
    }

    /// Insert or replace a tweet document
    pub async fn upsert_tweet(&self, tweet: &Tweet) -> Result<(), AppError> {
        let retweet = encode_json_list(&tweet.retweet)?;
        let like = encode_json_list(&tweet.like)?;
        let comments = encode_json_list(&tweet.comments)?;

        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO tweets (
                tweet_id, user_id, contents, image, video, create_date,
                retweet, like_list, comments, is_active
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tweet_id) DO UPDATE SET
                user_id = excluded.user_id,
                contents = excluded.contents,
                image = excluded.image,
                video = excluded.video,
                create_date = excluded.create_date,
                retweet = excluded.retweet,
                like_list = excluded.like_list,
                comments = excluded.comments,
                is_active = excluded.is_active
            "#,
        )
        .bind(&tweet.tweet_id)
        .bind(&tweet.user_id)
        .bind(&tweet.contents)
        .bind(&tweet.image)
        .bind(&tweet.video)
        .bind(tweet.create_date)
        .bind(retweet)
        .bind(like)
        .bind(comments)
        .bind(tweet.is_active)
        .execute(&self.pool)
        .await?;
        observe_db_query("UPSERT", "tweets", started.elapsed());

        Ok(())
    }

    // =========================================================================
    // Timelines
    // =========================================================================

    /// Append an item to the end of `owner`'s `tweet_list`
    pub async fn append_timeline_tweet(
        &self,
        owner: &str,
        entry: &TweetEntry,
    ) -> Result<(), AppError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO timelines (user_id) VALUES (?)")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO timeline_tweets (user_id, position, tweet_id, is_retweet, register_date)
            SELECT ?, COALESCE(MAX(position) + 1, 0), ?, ?, ?
            FROM timeline_tweets WHERE user_id = ?
            "#,
        )
        .bind(owner)
        .bind(&entry.tweet_id)
        .bind(entry.is_retweet)
        .bind(entry.register_date)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        observe_db_query("INSERT", "timeline_tweets", started.elapsed());
        Ok(())
    }

    /// Append an item to the end of `owner`'s `like_list`
    pub async fn append_timeline_like(
        &self,
        owner: &str,
        entry: &LikeEntry,
    ) -> Result<(), AppError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO timelines (user_id) VALUES (?)")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO timeline_likes (user_id, position, tweet_id, register_date)
            SELECT ?, COALESCE(MAX(position) + 1, 0), ?, ?
            FROM timeline_likes WHERE user_id = ?
            "#,
        )
        .bind(owner)
        .bind(&entry.tweet_id)
        .bind(entry.register_date)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        observe_db_query("INSERT", "timeline_likes", started.elapsed());
        Ok(())
    }

    /// Get the full timeline document of one user
    ///
    /// Collaborator read (e.g. the writer checking a list before appending);
    /// `None` if the user never had anything appended.
    pub async fn get_timeline(&self, user_id: &str) -> Result<Option<TimeLine>, AppError> {
        let started = Instant::now();
        let exists = sqlx::query_scalar::<_, String>("SELECT user_id FROM timelines WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        observe_db_query("SELECT", "timelines", started.elapsed());
        if exists.is_none() {
            return Ok(None);
        }

        let owners = [user_id.to_string()];
        let tweet_list = self
            .get_timeline_tweet_refs(&owners)
            .await?
            .into_iter()
            .map(|r| TweetEntry {
                tweet_id: r.tweet_id,
                is_retweet: r.is_retweet,
                register_date: r.register_date,
            })
            .collect();
        let like_list = self
            .get_timeline_like_refs(&owners)
            .await?
            .into_iter()
            .map(|r| LikeEntry {
                tweet_id: r.tweet_id,
                register_date: r.register_date,
            })
            .collect();

        Ok(Some(TimeLine {
            user_id: user_id.to_string(),
            tweet_list,
            like_list,
        }))
    }

    /// Flatten the `tweet_list` of every timeline owned by `owners`
    ///
    /// Rows come back ordered by the position of their owner in `owners`,
    /// then by list position.
    pub async fn get_timeline_tweet_refs(
        &self,
        owners: &[String],
    ) -> Result<Vec<TimelineRef>, AppError> {
        self.fetch_timeline_refs(
            "SELECT user_id, tweet_id, is_retweet, register_date FROM timeline_tweets",
            "timeline_tweets",
            owners,
        )
        .await
    }

    /// Flatten the `like_list` of every timeline owned by `owners`
    ///
    /// Same ordering as [`Database::get_timeline_tweet_refs`]. Likes are
    /// never retweets.
    pub async fn get_timeline_like_refs(
        &self,
        owners: &[String],
    ) -> Result<Vec<TimelineRef>, AppError> {
        self.fetch_timeline_refs(
            "SELECT user_id, tweet_id, 0 AS is_retweet, register_date FROM timeline_likes",
            "timeline_likes",
            owners,
        )
        .await
    }

    async fn fetch_timeline_refs(
        &self,
        select: &str,
        table: &'static str,
        owners: &[String],
    ) -> Result<Vec<TimelineRef>, AppError> {
        if owners.is_empty() {
            return Ok(vec![]);
        }

        // Chunks follow scope order, so concatenating them keeps
        // owner-then-position order.
        let started = Instant::now();
        let mut refs = Vec::new();
        for chunk in owners.chunks(IN_CHUNK_SIZE) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(select);
            query_builder.push(" WHERE user_id IN (");
            {
                let mut separated = query_builder.separated(", ");
                for owner in chunk {
                    separated.push_bind(owner);
                }
            }
            query_builder.push(") ORDER BY CASE user_id");
            for (index, owner) in chunk.iter().enumerate() {
                query_builder.push(" WHEN ");
                query_builder.push_bind(owner);
                query_builder.push(" THEN ");
                query_builder.push_bind(index as i64);
            }
            query_builder.push(" END, position ASC");

            refs.extend(
                query_builder
                    .build_query_as::<TimelineRef>()
                    .fetch_all(&self.pool)
                    .await?,
            );
        }
        observe_db_query("SELECT", table, started.elapsed());

        Ok(refs)
    }
}
