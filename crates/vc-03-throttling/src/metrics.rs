//! # Throttler Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `throttler_remaining_validator_bytes` - Free bytes in the validator pool
//! - `throttler_remaining_at_large_bytes` - Free bytes in the at-large pool
//! - `throttler_awaiting_acquire` - Acquires currently suspended
//! - `throttler_acquire_latency_seconds` - Wait time of acquires that had to queue

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref REMAINING_VDR_BYTES: IntGauge = register_int_gauge!(
        "throttler_remaining_validator_bytes",
        "Bytes left in the stake-weighted validator pool"
    )
    .expect("Failed to create REMAINING_VDR_BYTES metric");

    pub static ref REMAINING_AT_LARGE_BYTES: IntGauge = register_int_gauge!(
        "throttler_remaining_at_large_bytes",
        "Bytes left in the at-large pool"
    )
    .expect("Failed to create REMAINING_AT_LARGE_BYTES metric");

    pub static ref AWAITING_ACQUIRE: IntGauge = register_int_gauge!(
        "throttler_awaiting_acquire",
        "Number of acquires waiting for bytes"
    )
    .expect("Failed to create AWAITING_ACQUIRE metric");

    pub static ref ACQUIRE_LATENCY: Histogram = register_histogram!(
        "throttler_acquire_latency_seconds",
        "Time a queued acquire waited for its bytes in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to create ACQUIRE_LATENCY metric");
}

/// Publish the current pool levels
#[cfg(feature = "metrics")]
pub fn record_ledger(remaining_vdr: u64, remaining_at_large: u64, awaiting: usize) {
    REMAINING_VDR_BYTES.set(i64::try_from(remaining_vdr).unwrap_or(i64::MAX));
    REMAINING_AT_LARGE_BYTES.set(i64::try_from(remaining_at_large).unwrap_or(i64::MAX));
    AWAITING_ACQUIRE.set(i64::try_from(awaiting).unwrap_or(i64::MAX));
}

/// Record how long a queued acquire waited
#[cfg(feature = "metrics")]
pub fn record_acquire_latency(seconds: f64) {
    ACQUIRE_LATENCY.observe(seconds);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_ledger(_remaining_vdr: u64, _remaining_at_large: u64, _awaiting: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_acquire_latency(_seconds: f64) {}
