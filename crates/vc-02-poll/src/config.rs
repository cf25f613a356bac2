//! Poll parameters.

use serde::{Deserialize, Serialize};

use crate::error::{PollError, PollResult};

/// Sample size and quorum threshold for consensus polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Validators sampled per poll.
    pub k: usize,
    /// Votes an outcome needs to be decided in a round.
    pub alpha: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { k: 20, alpha: 15 }
    }
}

impl PollConfig {
    /// `1 <= alpha <= k`.
    pub fn validate(&self) -> PollResult<()> {
        if self.alpha == 0 {
            return Err(PollError::InvalidAlpha { alpha: self.alpha });
        }
        if self.k < self.alpha {
            return Err(PollError::InvalidConfig {
                k: self.k,
                alpha: self.alpha,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self { k: 3, alpha: 2 }
    }
}
