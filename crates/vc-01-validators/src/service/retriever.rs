//! # Validator Set Retrievers
//!
//! A retriever turns a reference point into a complete validator set.
//! `SourceRetriever` asks the external source every time; `CachingRetriever`
//! fronts any retriever with a bounded LRU keyed by block id.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{BlockId, Validator};
use tracing::debug;

use crate::domain::ValidatorSet;
use crate::error::{ValidatorError, ValidatorResult};
use crate::metrics;
use crate::ports::outbound::ValidatorSource;

/// Default number of cached validator sets.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Resolves the validator set at a reference point.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn get_validators(&self, block: BlockId) -> ValidatorResult<Arc<ValidatorSet>>;
}

/// Builds a fresh set from every source answer.
pub struct SourceRetriever {
    source: Arc<dyn ValidatorSource>,
}

impl SourceRetriever {
    pub fn new(source: Arc<dyn ValidatorSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Retriever for SourceRetriever {
    async fn get_validators(&self, block: BlockId) -> ValidatorResult<Arc<ValidatorSet>> {
        let weights = self.source.load_validators(block).await?;
        let mut validators: Vec<Validator> = weights
            .into_iter()
            .map(|(id, weight)| Validator::new(id, weight))
            .collect();
        validators.sort_unstable_by_key(|v| v.id);
        Ok(Arc::new(ValidatorSet::from_validators(&validators)?))
    }
}

/// LRU cache in front of another retriever.
///
/// The cache lock is never held across the inner retriever call. Two callers
/// missing on the same block may both load it; the later insert wins.
pub struct CachingRetriever {
    inner: Arc<dyn Retriever>,
    cache: Mutex<LruCache<BlockId, Arc<ValidatorSet>>>,
}

impl CachingRetriever {
    /// Wrap `inner` with a cache of `capacity` sets.
    pub fn new(inner: Arc<dyn Retriever>, capacity: usize) -> ValidatorResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| ValidatorError::InvalidConfig {
            reason: "validator set cache capacity must be non-zero".to_string(),
        })?;
        Ok(Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Cached entry for `block`, if any.
    pub fn peek(&self, block: &BlockId) -> Option<Arc<ValidatorSet>> {
        self.cache.lock().get(block).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Retriever for CachingRetriever {
    async fn get_validators(&self, block: BlockId) -> ValidatorResult<Arc<ValidatorSet>> {
        if let Some(hit) = self.peek(&block) {
            debug!(block = %block, "[vc-01] Validator set cache hit");
            metrics::record_cache_lookup(true);
            return Ok(hit);
        }

        debug!(block = %block, "[vc-01] Validator set cache miss");
        metrics::record_cache_lookup(false);
        let set = self.inner.get_validators(block).await?;
        self.cache.lock().put(block, Arc::clone(&set));
        Ok(set)
    }
}
