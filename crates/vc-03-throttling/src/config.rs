//! Byte throttler configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by an invalid throttler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottlerConfigError {
    /// Both pools are empty, so nothing could ever be admitted
    #[error("Throttler has no byte budget: validator and at-large allocations are both zero")]
    NoBudget,

    /// Per-node at-large cap is larger than the pool it draws from
    #[error("Per-node at-large cap {node_max} exceeds at-large allocation {at_large}")]
    NodeCapExceedsPool { node_max: u64, at_large: u64 },
}

/// Byte budgets for the inbound message throttler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteThrottlerConfig {
    /// Bytes split among validators in proportion to stake.
    pub vdr_alloc_size: u64,
    /// Bytes any peer may draw from, first come first served.
    pub at_large_alloc_size: u64,
    /// Most at-large bytes a single peer may hold at once.
    pub node_max_at_large_bytes: u64,
}

impl Default for ByteThrottlerConfig {
    fn default() -> Self {
        Self {
            vdr_alloc_size: 32 * 1024 * 1024,
            at_large_alloc_size: 32 * 1024 * 1024,
            node_max_at_large_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ByteThrottlerConfig {
    pub fn validate(&self) -> Result<(), ThrottlerConfigError> {
        if self.vdr_alloc_size == 0 && self.at_large_alloc_size == 0 {
            return Err(ThrottlerConfigError::NoBudget);
        }
        if self.node_max_at_large_bytes > self.at_large_alloc_size {
            return Err(ThrottlerConfigError::NodeCapExceedsPool {
                node_max: self.node_max_at_large_bytes,
                at_large: self.at_large_alloc_size,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            vdr_alloc_size: 1024,
            at_large_alloc_size: 1024,
            node_max_at_large_bytes: 1024,
        }
    }
}
