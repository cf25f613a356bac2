//! In-Memory Validator Source Adapter
//!
//! Implements `ValidatorSource` over a table of pre-registered reference
//! points. Used by local networks and by tests that need to count source
//! round trips or inject outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockId, ValidatorId};
use tracing::debug;

use crate::error::SourceError;
use crate::ports::outbound::ValidatorSource;

#[derive(Default)]
struct SourceTable {
    current: Option<BlockId>,
    sets: HashMap<BlockId, HashMap<ValidatorId, u64>>,
}

/// Validator source backed by an in-memory table.
#[derive(Default)]
pub struct StaticValidatorSource {
    table: RwLock<SourceTable>,
    loads: AtomicUsize,
    unavailable: AtomicBool,
}

impl StaticValidatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the weights at `reference` and make it the current point.
    pub fn accept(&self, reference: BlockId, weights: HashMap<ValidatorId, u64>) {
        let mut table = self.table.write();
        table.sets.insert(reference, weights);
        table.current = Some(reference);
    }

    /// Register the weights at `reference` without moving the current point.
    pub fn insert(&self, reference: BlockId, weights: HashMap<ValidatorId, u64>) {
        self.table.write().sets.insert(reference, weights);
    }

    /// Simulate an outage: every call fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `load_validators` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), SourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable {
                reason: "static source marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ValidatorSource for StaticValidatorSource {
    async fn current_reference_point(&self) -> Result<BlockId, SourceError> {
        self.check_available()?;
        self.table.read().current.ok_or(SourceError::Unavailable {
            reason: "no block accepted yet".to_string(),
        })
    }

    async fn load_validators(
        &self,
        reference: BlockId,
    ) -> Result<HashMap<ValidatorId, u64>, SourceError> {
        self.check_available()?;
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(reference = %reference, "[vc-01] Static source load");
        self.table
            .read()
            .sets
            .get(&reference)
            .cloned()
            .ok_or(SourceError::UnknownReference(reference))
    }
}
