//! # Validator Manager
//!
//! Owns the live validator set every other component reads from.
//!
//! ## Modes
//!
//! - **Static**: no source. The injected network default set is served as is.
//! - **Sourced**: each `get_validators` call asks the source for its current
//!   reference point. An unchanged point returns the live set untouched. A new
//!   point goes through the caching retriever and the result is mirrored into
//!   the live set, so callers always see the same `Arc` identity.
//!
//! Source failures are logged and the last known good membership is served.
//! Masks are held by the live set and survive every refresh.

use std::fmt;
use std::sync::Arc;

use shared_types::{BlockId, ValidatorId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{MaskOwner, NetworkId, ValidatorSet};
use crate::error::{ValidatorError, ValidatorResult};
use crate::metrics;
use crate::ports::outbound::ValidatorSource;
use crate::service::retriever::{CachingRetriever, Retriever, SourceRetriever, DEFAULT_CACHE_CAPACITY};
use crate::service::updater::{RetrievingUpdater, Updater};

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Number of validator sets cached by reference point.
    pub cache_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> ValidatorResult<()> {
        if self.cache_capacity == 0 {
            return Err(ValidatorError::InvalidConfig {
                reason: "validator set cache capacity must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self { cache_capacity: 4 }
    }
}

struct Sourcing {
    source: Arc<dyn ValidatorSource>,
    retriever: Arc<CachingRetriever>,
    updater: RetrievingUpdater,
    /// Reference point the live set currently mirrors. The lock also
    /// serializes refreshes.
    mirrored: Mutex<Option<BlockId>>,
}

/// Validator manager holding the live set.
pub struct ValidatorManager {
    network: NetworkId,
    live: Arc<ValidatorSet>,
    sourcing: Option<Sourcing>,
}

impl ValidatorManager {
    /// Manager serving a fixed default set.
    pub fn new(network: NetworkId, defaults: ValidatorSet) -> Self {
        Self {
            network,
            live: Arc::new(defaults),
            sourcing: None,
        }
    }

    /// Manager backed by an external source.
    ///
    /// `defaults` seeds the live set until the first successful refresh.
    pub fn with_source(
        network: NetworkId,
        defaults: ValidatorSet,
        source: Arc<dyn ValidatorSource>,
        config: ManagerConfig,
    ) -> ValidatorResult<Self> {
        config.validate()?;
        let live = Arc::new(defaults);
        let inner: Arc<dyn Retriever> = Arc::new(SourceRetriever::new(Arc::clone(&source)));
        let retriever = Arc::new(CachingRetriever::new(inner, config.cache_capacity)?);
        let updater = RetrievingUpdater::new(Arc::clone(&live), retriever.clone());
        Ok(Self {
            network,
            live,
            sourcing: Some(Sourcing {
                source,
                retriever,
                updater,
                mirrored: Mutex::new(None),
            }),
        })
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// The live set without a refresh. Shared with the benchlist and the
    /// throttler at wiring time.
    pub fn live_set(&self) -> Arc<ValidatorSet> {
        Arc::clone(&self.live)
    }

    /// The live set, refreshed from the source when one is attached.
    pub async fn get_validators(&self) -> ValidatorResult<Arc<ValidatorSet>> {
        if let Some(sourcing) = &self.sourcing {
            if let Err(err) = self.refresh(sourcing).await {
                metrics::record_refresh_failure();
                if self.live.is_empty() {
                    return Err(err);
                }
                warn!(
                    network = self.network.as_u32(),
                    error = %err,
                    "[vc-01] Validator refresh failed, serving last known set"
                );
            }
        }

        if self.live.is_empty() {
            return Err(ValidatorError::NoValidators);
        }
        Ok(self.live_set())
    }

    /// The set at `block`. Cache first, source on a miss. Without a source
    /// every block maps to the live set.
    pub async fn get_validators_by_block_id(
        &self,
        block: BlockId,
    ) -> ValidatorResult<Arc<ValidatorSet>> {
        match &self.sourcing {
            Some(sourcing) => sourcing.retriever.get_validators(block).await,
            None => Ok(self.live_set()),
        }
    }

    /// Hide `id` from the live set. Returns `true` if newly masked by the
    /// manager.
    pub fn mask_validator(&self, id: ValidatorId) -> bool {
        self.live.mask(id, MaskOwner::Operator)
    }

    /// Drop the manager's mask on `id`. Returns `true` if it held one. A
    /// benched validator stays hidden until its bench ends.
    pub fn reveal_validator(&self, id: ValidatorId) -> bool {
        self.live.reveal(id, MaskOwner::Operator)
    }

    /// True if `id` is an unmasked member of the live set.
    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.live.contains(id)
    }

    async fn refresh(&self, sourcing: &Sourcing) -> ValidatorResult<()> {
        let mut mirrored = sourcing.mirrored.lock().await;
        let current = sourcing.source.current_reference_point().await?;
        if *mirrored == Some(current) {
            return Ok(());
        }

        debug!(
            block = %current,
            previous = ?*mirrored,
            "[vc-01] Reference point moved"
        );
        sourcing.updater.update_validators(current).await?;
        *mirrored = Some(current);
        Ok(())
    }
}

impl fmt::Display for ValidatorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validator Manager: (Size = {})\n    Network[{}]: {}",
            self.live.len(),
            self.network.as_u32(),
            self.live
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticValidatorSource;
    use shared_types::Validator;
    use std::collections::HashMap;

    fn vdr(n: u8) -> ValidatorId {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        ValidatorId::new(bytes)
    }

    fn block(n: u8) -> BlockId {
        BlockId::new([n; 32])
    }

    fn defaults() -> ValidatorSet {
        ValidatorSet::from_validators(&[Validator::new(vdr(100), 50_000)]).unwrap()
    }

    fn sourced(source: Arc<StaticValidatorSource>, seed: ValidatorSet) -> ValidatorManager {
        ValidatorManager::with_source(
            NetworkId::Local,
            seed,
            source,
            ManagerConfig::for_testing(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_static_manager_serves_defaults() {
        let manager = ValidatorManager::new(NetworkId::Flare, defaults());
        let set = manager.get_validators().await.unwrap();
        assert!(set.contains(&vdr(100)));

        let again = manager.get_validators().await.unwrap();
        assert!(Arc::ptr_eq(&set, &again));
    }

    #[tokio::test]
    async fn test_static_manager_empty_default_fails() {
        let manager = ValidatorManager::new(NetworkId::Flare, ValidatorSet::new());
        assert!(matches!(
            manager.get_validators().await,
            Err(ValidatorError::NoValidators)
        ));
    }

    #[tokio::test]
    async fn test_refresh_mirrors_source_into_live_set() {
        let source = Arc::new(StaticValidatorSource::new());
        source.accept(block(1), HashMap::from([(vdr(1), 10), (vdr(2), 20)]));
        let manager = sourced(source.clone(), defaults());

        let live = manager.live_set();
        let set = manager.get_validators().await.unwrap();
        assert!(Arc::ptr_eq(&live, &set));
        assert_eq!(set.total_weight(), 30);
        assert!(!set.contains(&vdr(100)));

        source.accept(block(2), HashMap::from([(vdr(3), 5)]));
        let set = manager.get_validators().await.unwrap();
        assert!(Arc::ptr_eq(&live, &set));
        assert_eq!(set.total_weight(), 5);
        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_reference_skips_load() {
        let source = Arc::new(StaticValidatorSource::new());
        source.accept(block(1), HashMap::from([(vdr(1), 10)]));
        let manager = sourced(source.clone(), ValidatorSet::new());

        manager.get_validators().await.unwrap();
        manager.get_validators().await.unwrap();
        manager.get_validators().await.unwrap();
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_returning_to_cached_reference_uses_cache() {
        let source = Arc::new(StaticValidatorSource::new());
        source.accept(block(1), HashMap::from([(vdr(1), 10)]));
        let manager = sourced(source.clone(), ValidatorSet::new());
        manager.get_validators().await.unwrap();

        source.accept(block(2), HashMap::from([(vdr(2), 10)]));
        manager.get_validators().await.unwrap();

        // Point back at the first block without re-registering it.
        source.accept(block(1), HashMap::from([(vdr(1), 10)]));
        let set = manager.get_validators().await.unwrap();
        assert!(set.contains(&vdr(1)));
        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn test_source_failure_serves_last_known_good() {
        let source = Arc::new(StaticValidatorSource::new());
        source.accept(block(1), HashMap::from([(vdr(1), 10)]));
        let manager = sourced(source.clone(), ValidatorSet::new());
        manager.get_validators().await.unwrap();

        source.set_unavailable(true);
        let set = manager.get_validators().await.unwrap();
        assert!(set.contains(&vdr(1)));
    }

    #[tokio::test]
    async fn test_source_failure_with_empty_live_set_errors() {
        let source = Arc::new(StaticValidatorSource::new());
        source.set_unavailable(true);
        let manager = sourced(source, ValidatorSet::new());
        assert!(matches!(
            manager.get_validators().await,
            Err(ValidatorError::Source(_))
        ));
    }

    #[tokio::test]
    async fn test_get_by_block_id_hits_source_once() {
        let source = Arc::new(StaticValidatorSource::new());
        source.insert(block(7), HashMap::from([(vdr(1), 10), (vdr(2), 3)]));
        let manager = sourced(source.clone(), defaults());

        let first = manager.get_validators_by_block_id(block(7)).await.unwrap();
        let second = manager.get_validators_by_block_id(block(7)).await.unwrap();

        assert_eq!(first.list(), second.list());
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_mask_survives_refresh() {
        let source = Arc::new(StaticValidatorSource::new());
        source.accept(block(1), HashMap::from([(vdr(1), 10), (vdr(2), 20)]));
        let manager = sourced(source.clone(), ValidatorSet::new());
        manager.get_validators().await.unwrap();

        assert!(manager.mask_validator(vdr(2)));
        assert!(!manager.contains(&vdr(2)));

        source.accept(block(2), HashMap::from([(vdr(1), 10), (vdr(2), 25)]));
        let set = manager.get_validators().await.unwrap();
        assert!(!set.contains(&vdr(2)));
        assert_eq!(set.total_weight(), 10);

        assert!(manager.reveal_validator(vdr(2)));
        assert_eq!(set.total_weight(), 35);
    }

    #[tokio::test]
    async fn test_operator_reveal_keeps_bench_mask() {
        let manager = ValidatorManager::new(NetworkId::Local, defaults());
        let live = manager.live_set();
        let benched = live.list()[0].id;
        live.mask(benched, MaskOwner::Benchlist);

        assert!(!manager.reveal_validator(benched));
        assert!(!manager.contains(&benched));

        // An operator mask outlives the bench.
        assert!(manager.mask_validator(benched));
        live.reveal(benched, MaskOwner::Benchlist);
        assert!(!manager.contains(&benched));
        assert!(manager.reveal_validator(benched));
        assert!(manager.contains(&benched));
    }

    #[tokio::test]
    async fn test_display_names_network() {
        let manager = ValidatorManager::new(NetworkId::Coston, defaults());
        let text = manager.to_string();
        assert!(text.contains("Network[7]"));
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let result = ValidatorManager::with_source(
            NetworkId::Local,
            defaults(),
            Arc::new(StaticValidatorSource::new()),
            ManagerConfig { cache_capacity: 0 },
        );
        assert!(matches!(result, Err(ValidatorError::InvalidConfig { .. })));
    }
}
