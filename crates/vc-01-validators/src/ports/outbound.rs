//! Driven Ports (SPI - Outbound Dependencies)

use std::collections::HashMap;

use async_trait::async_trait;
use shared_types::{BlockId, ValidatorId};

use crate::error::SourceError;

/// External authority for validator membership, usually a platform chain.
///
/// Reference points are accepted block ids. The source is read only; the
/// manager never pushes anything back into it.
#[async_trait]
pub trait ValidatorSource: Send + Sync {
    /// Latest accepted reference point.
    async fn current_reference_point(&self) -> Result<BlockId, SourceError>;

    /// Validator weights as of `reference`.
    async fn load_validators(
        &self,
        reference: BlockId,
    ) -> Result<HashMap<ValidatorId, u64>, SourceError>;
}
