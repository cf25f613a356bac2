//! Error types for the poll subsystem

use thiserror::Error;

/// Poll construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Alpha must be at least one
    #[error("Invalid alpha {alpha}: must be at least 1")]
    InvalidAlpha { alpha: usize },

    /// Alpha larger than the number of polled voters can never be reached
    #[error("Alpha {alpha} exceeds the {voters} polled voters")]
    AlphaExceedsVoters { alpha: usize, voters: usize },

    /// Sample size cannot be below alpha
    #[error("Invalid poll config: k = {k}, alpha = {alpha}")]
    InvalidConfig { k: usize, alpha: usize },
}

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;
