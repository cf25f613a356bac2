//! # Validator Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `validators_cache_lookups_total{result}` - Validator set cache hits and misses
//! - `validators_refresh_failures_total` - Source refreshes that fell back to the last known set

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Cache lookups labeled by result
    pub static ref CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "validators_cache_lookups_total",
        "Validator set cache lookups",
        &["result"]
    )
    .expect("Failed to create CACHE_LOOKUPS metric");

    /// Failed source refreshes
    pub static ref REFRESH_FAILURES: IntCounter = register_int_counter!(
        "validators_refresh_failures_total",
        "Validator source refreshes that failed"
    )
    .expect("Failed to create REFRESH_FAILURES metric");
}

/// Record a cache lookup
#[cfg(feature = "metrics")]
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Record a failed refresh
#[cfg(feature = "metrics")]
pub fn record_refresh_failure() {
    REFRESH_FAILURES.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_cache_lookup(_hit: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_refresh_failure() {}
