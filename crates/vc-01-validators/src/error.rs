//! Error types for the validators subsystem

use shared_types::{BlockId, IdError, ValidatorId};
use thiserror::Error;

/// Failures reported by an external validator source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source has no validator data for the reference point.
    #[error("Unknown reference point: {0}")]
    UnknownReference(BlockId),

    /// The source could not be reached or answered with garbage.
    #[error("Validator source unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Validators subsystem errors
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Weight of zero, or an addition that would overflow a total
    #[error("Invalid weight {weight} for validator {validator}")]
    InvalidWeight { validator: ValidatorId, weight: u64 },

    /// Removal targeted a validator that is not in the set
    #[error("Validator not found: {0}")]
    NotFound(ValidatorId),

    /// Removal asked for more weight than the validator holds
    #[error("Insufficient weight for {validator}: has {have}, asked to remove {requested}")]
    InsufficientWeight {
        validator: ValidatorId,
        have: u64,
        requested: u64,
    },

    /// A bulk replacement listed the same validator twice
    #[error("Duplicate validator in list: {0}")]
    Duplicate(ValidatorId),

    /// Bulk replacement would overflow the total weight
    #[error("Total weight overflow")]
    WeightOverflow,

    /// No validators available to serve the request
    #[error("No validators available")]
    NoValidators,

    /// Sampling asked for more validators than are eligible
    #[error("Cannot sample {requested} validators, only {available} eligible")]
    InsufficientValidators { requested: usize, available: usize },

    /// Error from the external source
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A configured node id could not be parsed
    #[error("Invalid node id {input:?}: {source}")]
    InvalidNodeId {
        input: String,
        #[source]
        source: IdError,
    },

    /// Construction-time configuration problem
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Result type for validator operations
pub type ValidatorResult<T> = Result<T, ValidatorError>;
