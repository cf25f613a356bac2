//! Domain layer: the weighted set, sampling and default memberships.

pub mod defaults;
pub mod sampler;
pub mod set;

pub use defaults::{parse_node_id, DefaultValidatorsConfig, NetworkId, VALIDATORS_FILE_ENV};
pub use sampler::SampleSeed;
pub use set::{MaskOwner, ValidatorSet};
