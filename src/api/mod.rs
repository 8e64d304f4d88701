//! API layer
//!
//! HTTP handlers for:
//! - Timeline reading endpoints
//! - Metrics (Prometheus)

mod converters;
mod dto;
pub mod metrics;
mod reading;

pub use converters::*;
pub use dto::*;

pub use metrics::metrics_router;
pub use reading::reading_router;
