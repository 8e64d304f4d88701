//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tweetline_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tweetline_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Timeline Metrics
    pub static ref TIMELINE_ROWS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tweetline_timeline_rows",
            "Rows returned per timeline aggregation"
        ).buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
        &["view"]
    ).expect("metric can be created");
    pub static ref TIMELINE_FAIL_SOFT_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_timeline_fail_soft_total", "Timeline requests answered with an empty list after an error"),
        &["view", "error_type"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Record one database query and its duration.
pub fn observe_db_query(operation: &str, table: &str, elapsed: Duration) {
    DB_QUERIES_TOTAL
        .with_label_values(&[operation, table])
        .inc();
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(elapsed.as_secs_f64());
}

/// Initialize metrics registry.
///
/// Safe to call more than once; repeated registrations are ignored.
pub fn init_metrics() {
    let collectors: Vec<(&str, Box<dyn prometheus::core::Collector>)> = vec![
        ("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone())),
        (
            "HTTP_REQUEST_DURATION_SECONDS",
            Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        ),
        ("DB_QUERIES_TOTAL", Box::new(DB_QUERIES_TOTAL.clone())),
        (
            "DB_QUERY_DURATION_SECONDS",
            Box::new(DB_QUERY_DURATION_SECONDS.clone()),
        ),
        ("TIMELINE_ROWS", Box::new(TIMELINE_ROWS.clone())),
        (
            "TIMELINE_FAIL_SOFT_TOTAL",
            Box::new(TIMELINE_FAIL_SOFT_TOTAL.clone()),
        ),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) => {}
            Err(prometheus::Error::AlreadyReg) => {
                tracing::debug!(metric = name, "Metric already registered");
            }
            Err(error) => {
                tracing::error!(metric = name, %error, "Failed to register metric");
            }
        }
    }

    tracing::info!("Metrics registry initialized");
}
