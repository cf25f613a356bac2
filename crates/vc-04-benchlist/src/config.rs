//! Benchlist configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchlistError, BenchlistResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchlistConfig {
    /// Consecutive failures before a validator may be benched.
    pub threshold: u32,
    /// How long a validator must have been failing before it may be benched.
    pub minimum_failing_duration: Duration,
    /// Upper bound of the bench period. The actual period is drawn from
    /// `[duration / 2, duration]`.
    pub duration: Duration,
    /// Largest share of total stake that may be benched at once.
    pub max_portion: f64,
}

impl Default for BenchlistConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            minimum_failing_duration: Duration::from_secs(150),
            duration: Duration::from_secs(15 * 60),
            max_portion: 0.25,
        }
    }
}

impl BenchlistConfig {
    pub fn validate(&self) -> BenchlistResult<()> {
        if self.threshold == 0 {
            return Err(invalid("threshold must be at least 1"));
        }
        if self.duration.is_zero() {
            return Err(invalid("bench duration must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.max_portion) {
            return Err(invalid(format!(
                "max benched portion {} is outside [0, 1]",
                self.max_portion
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            threshold: 3,
            minimum_failing_duration: Duration::from_secs(5 * 60),
            duration: Duration::from_secs(60),
            max_portion: 0.5,
        }
    }
}

fn invalid(reason: impl Into<String>) -> BenchlistError {
    BenchlistError::InvalidConfig {
        reason: reason.into(),
    }
}
