//! Conversion functions from service views to API DTOs

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Utc};

use crate::api::dto::*;
use crate::service::{TweetView, UserSummary, UserTimeline};

/// How timestamps are rendered for display
#[derive(Debug, Clone)]
pub struct DisplayClock {
    pub offset: FixedOffset,
    pub format: String,
}

impl DisplayClock {
    /// Render `instant` in the display offset
    ///
    /// Falls back to RFC 3339 if the format string cannot be rendered.
    pub fn render(&self, instant: DateTime<Utc>) -> String {
        let local = instant.with_timezone(&self.offset);
        let mut rendered = String::new();
        if write!(rendered, "{}", local.format(&self.format)).is_err() {
            return local.to_rfc3339();
        }
        rendered
    }
}

/// Convert UserSummary to UserSummaryResponse
pub fn user_summary_to_response(user: &UserSummary) -> UserSummaryResponse {
    UserSummaryResponse {
        user_id: user.user_id.clone(),
        name: user.name.clone(),
        profile_color: user.profile_color.clone(),
        description: user.description.clone(),
        follower: user.follower.clone(),
        following: user.following.clone(),
        follower_count: user.follower_count,
        following_count: user.following_count,
    }
}

/// Convert TweetView to TweetViewResponse
pub fn tweet_view_to_response(view: &TweetView, clock: &DisplayClock) -> TweetViewResponse {
    TweetViewResponse {
        user_id: view.user_id.clone(),
        writer_id: view.writer_id.clone(),
        tweet_id: view.tweet_id.clone(),
        video: view.video.clone(),
        image: view.image.clone(),
        contents: view.contents.clone(),
        create_date: view.create_date,
        create_date_display: clock.render(view.create_date),
        retweet: view.retweet.clone(),
        retweet_count: view.retweet_count,
        like: view.like.clone(),
        like_count: view.like_count,
        comments: view.comments.clone(),
        comments_count: view.comments_count,
        is_retweet: view.is_retweet,
        register_date: view.register_date,
        user: user_summary_to_response(&view.user),
    }
}

/// Convert a list of rows
pub fn tweet_views_to_response(views: &[TweetView], clock: &DisplayClock) -> Vec<TweetViewResponse> {
    views
        .iter()
        .map(|view| tweet_view_to_response(view, clock))
        .collect()
}

/// Convert UserTimeline to UserTimelineResponse
pub fn user_timeline_to_response(
    timeline: &UserTimeline,
    clock: &DisplayClock,
) -> UserTimelineResponse {
    UserTimelineResponse {
        user: user_summary_to_response(&timeline.user),
        time_line: tweet_views_to_response(&timeline.time_line, clock),
    }
}
