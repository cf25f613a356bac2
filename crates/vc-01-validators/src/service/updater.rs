//! Mirrors retrieved validator sets into a live set.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::BlockId;
use tracing::info;

use crate::domain::ValidatorSet;
use crate::error::ValidatorResult;
use crate::service::retriever::Retriever;

/// Moves a live set to the membership at a reference point.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn update_validators(&self, block: BlockId) -> ValidatorResult<()>;
}

/// Updater that fetches through a retriever and bulk-replaces the live set.
pub struct RetrievingUpdater {
    live: Arc<ValidatorSet>,
    retriever: Arc<dyn Retriever>,
}

impl RetrievingUpdater {
    pub fn new(live: Arc<ValidatorSet>, retriever: Arc<dyn Retriever>) -> Self {
        Self { live, retriever }
    }
}

#[async_trait]
impl Updater for RetrievingUpdater {
    async fn update_validators(&self, block: BlockId) -> ValidatorResult<()> {
        let retrieved = self.retriever.get_validators(block).await?;
        // Built outside the live lock; `set` swaps in one step.
        self.live.set(&retrieved.list())?;
        info!(
            block = %block,
            validators = self.live.len(),
            total_weight = self.live.total_weight(),
            "[vc-01] Live validator set replaced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticValidatorSource;
    use crate::domain::MaskOwner;
    use crate::service::retriever::SourceRetriever;
    use shared_types::ValidatorId;
    use std::collections::HashMap;

    fn vdr(n: u8) -> ValidatorId {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        ValidatorId::new(bytes)
    }

    #[tokio::test]
    async fn test_update_replaces_membership_and_keeps_masks() {
        let block = BlockId::new([1; 32]);
        let source = Arc::new(StaticValidatorSource::new());
        source.insert(block, HashMap::from([(vdr(1), 5), (vdr(2), 6)]));

        let live = Arc::new(ValidatorSet::new());
        live.add_weight(vdr(9), 100).unwrap();
        live.mask(vdr(2), MaskOwner::Operator);

        let updater = RetrievingUpdater::new(live.clone(), Arc::new(SourceRetriever::new(source)));
        updater.update_validators(block).await.unwrap();

        assert!(!live.contains(&vdr(9)));
        assert!(live.contains(&vdr(1)));
        assert!(!live.contains(&vdr(2)));
        assert_eq!(live.total_weight(), 5);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_live_set() {
        let source = Arc::new(StaticValidatorSource::new());
        let live = Arc::new(ValidatorSet::new());
        live.add_weight(vdr(9), 100).unwrap();

        let updater = RetrievingUpdater::new(live.clone(), Arc::new(SourceRetriever::new(source)));
        assert!(updater.update_validators(BlockId::new([3; 32])).await.is_err());
        assert!(live.contains(&vdr(9)));
    }
}
