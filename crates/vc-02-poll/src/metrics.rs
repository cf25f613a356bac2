//! # Poll Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `polls_created_total` - Polls started
//! - `polls_finished_total` - Polls whose result was delivered
//! - `poll_duration_seconds` - Time from creation to delivery

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Polls started
    pub static ref POLLS_CREATED: IntCounter = register_int_counter!(
        "polls_created_total",
        "Total number of polls created"
    )
    .expect("Failed to create POLLS_CREATED metric");

    /// Polls delivered
    pub static ref POLLS_FINISHED: IntCounter = register_int_counter!(
        "polls_finished_total",
        "Total number of polls finished"
    )
    .expect("Failed to create POLLS_FINISHED metric");

    /// Poll lifetime
    pub static ref POLL_DURATION: Histogram = register_histogram!(
        "poll_duration_seconds",
        "Time from poll creation to result delivery in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create POLL_DURATION metric");
}

/// Record a poll creation
#[cfg(feature = "metrics")]
pub fn record_poll_created() {
    POLLS_CREATED.inc();
}

/// Record a delivered poll and its lifetime
#[cfg(feature = "metrics")]
pub fn record_poll_finished(seconds: f64) {
    POLLS_FINISHED.inc();
    POLL_DURATION.observe(seconds);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_poll_created() {}

#[cfg(not(feature = "metrics"))]
pub fn record_poll_finished(_seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable() {
        record_poll_created();
        record_poll_finished(0.5);
    }
}
