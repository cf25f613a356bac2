//! # Benchlist Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `benchlist_benched_num` - Validators currently benched
//! - `benchlist_benched_weight` - Stake currently benched

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_gauge, IntGauge};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BENCHED_NUM: IntGauge = register_int_gauge!(
        "benchlist_benched_num",
        "Number of currently benched validators"
    )
    .expect("Failed to create BENCHED_NUM metric");

    pub static ref BENCHED_WEIGHT: IntGauge = register_int_gauge!(
        "benchlist_benched_weight",
        "Weight of currently benched validators"
    )
    .expect("Failed to create BENCHED_WEIGHT metric");
}

/// Publish the current bench size
#[cfg(feature = "metrics")]
pub fn record_benched(count: usize, weight: u64) {
    BENCHED_NUM.set(i64::try_from(count).unwrap_or(i64::MAX));
    BENCHED_WEIGHT.set(i64::try_from(weight).unwrap_or(i64::MAX));
}

#[cfg(not(feature = "metrics"))]
pub fn record_benched(_count: usize, _weight: u64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_callable() {
        record_benched(2, 2000);
    }
}
