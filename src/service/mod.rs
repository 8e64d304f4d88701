//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the store and the aggregation pipeline.

pub mod aggregate;
mod timeline;

pub use aggregate::{ListSource, Scope, TweetView, UserSummary};
pub use timeline::{TimelineService, UserTimeline};
