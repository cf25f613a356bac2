//! Benchlist errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BenchlistError {
    /// Configuration rejected at construction
    #[error("Invalid benchlist configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The expiry sweeper needs a Tokio runtime to run on
    #[error("Benchlist must be created inside a Tokio runtime")]
    NoRuntime,
}

pub type BenchlistResult<T> = Result<T, BenchlistError>;
