//! # Weighted Validator Set
//!
//! In-memory mapping `ValidatorId -> weight` with an incrementally maintained
//! total and a mask overlay.
//!
//! ## Masking
//!
//! A masked validator stays in the backing map but is invisible to sampling,
//! `contains`, `len`, `list` and `total_weight`. The mask is recorded by id,
//! so it also applies to a validator that joins later and survives a bulk
//! `set` replacement. `reveal` restores the exact weight held at that time.
//!
//! Each [`MaskOwner`] holds its own mask on an id. The validator stays hidden
//! until every owner has revealed it, so an operator mask outlives a bench
//! and an operator reveal does not cut a bench short.
//!
//! ## Concurrency
//!
//! All state sits behind one `RwLock`. The set never calls out while holding
//! it, so other components may call into the set while holding their own lock.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use shared_types::{Validator, ValidatorId};

use super::sampler::{sample_weighted, SampleSeed};
use crate::error::{ValidatorError, ValidatorResult};

/// Who put a mask on a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskOwner {
    /// Masked through the validator manager.
    Operator,
    /// Masked while benched.
    Benchlist,
}

#[derive(Debug, Default, Clone)]
struct SetState {
    /// Every member, masked or not.
    weights: HashMap<ValidatorId, u64>,
    /// Ids hidden from readers, with the owners of each mask. May name ids
    /// that are not members. Never holds an empty owner set.
    masked: HashMap<ValidatorId, HashSet<MaskOwner>>,
    /// Sum of unmasked member weights.
    total_weight: u64,
    /// Sum of masked member weights.
    masked_weight: u64,
}

impl SetState {
    fn is_visible(&self, id: &ValidatorId) -> bool {
        !self.masked.contains_key(id) && self.weights.contains_key(id)
    }

    fn sorted_unmasked(&self) -> Vec<(ValidatorId, u64)> {
        let mut out: Vec<_> = self
            .weights
            .iter()
            .filter(|(id, _)| !self.masked.contains_key(*id))
            .map(|(id, w)| (*id, *w))
            .collect();
        out.sort_unstable_by_key(|(id, _)| *id);
        out
    }
}

/// Thread-safe weighted validator set.
#[derive(Debug, Default)]
pub struct ValidatorSet {
    state: RwLock<SetState>,
}

impl ValidatorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list, with the same rules as [`ValidatorSet::set`].
    pub fn from_validators(validators: &[Validator]) -> ValidatorResult<Self> {
        let set = Self::new();
        set.set(validators)?;
        Ok(set)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Add `weight` to `id`, inserting it if absent.
    pub fn add_weight(&self, id: ValidatorId, weight: u64) -> ValidatorResult<()> {
        if weight == 0 {
            return Err(ValidatorError::InvalidWeight {
                validator: id,
                weight,
            });
        }

        let invalid = || ValidatorError::InvalidWeight {
            validator: id,
            weight,
        };
        let mut state = self.state.write();
        let current = state.weights.get(&id).copied().unwrap_or(0);
        let new_weight = current.checked_add(weight).ok_or_else(invalid)?;
        // Unmasked plus masked totals share one u64 budget.
        state
            .total_weight
            .checked_add(state.masked_weight)
            .and_then(|sum| sum.checked_add(weight))
            .ok_or_else(invalid)?;

        state.weights.insert(id, new_weight);
        if state.masked.contains_key(&id) {
            state.masked_weight += weight;
        } else {
            state.total_weight += weight;
        }
        Ok(())
    }

    /// Remove `weight` from `id`, dropping the entry when nothing is left.
    pub fn remove_weight(&self, id: ValidatorId, weight: u64) -> ValidatorResult<()> {
        let mut state = self.state.write();
        let current = *state
            .weights
            .get(&id)
            .ok_or(ValidatorError::NotFound(id))?;
        if weight > current {
            return Err(ValidatorError::InsufficientWeight {
                validator: id,
                have: current,
                requested: weight,
            });
        }

        let remaining = current - weight;
        if remaining == 0 {
            state.weights.remove(&id);
        } else {
            state.weights.insert(id, remaining);
        }
        if state.masked.contains_key(&id) {
            state.masked_weight -= weight;
        } else {
            state.total_weight -= weight;
        }
        Ok(())
    }

    /// Hide `id` on behalf of `owner`. Returns `true` if `owner` had not
    /// masked it already.
    pub fn mask(&self, id: ValidatorId, owner: MaskOwner) -> bool {
        let mut state = self.state.write();
        let was_hidden = state.masked.contains_key(&id);
        if !state.masked.entry(id).or_default().insert(owner) {
            return false;
        }
        if !was_hidden {
            if let Some(weight) = state.weights.get(&id).copied() {
                state.total_weight -= weight;
                state.masked_weight += weight;
            }
        }
        true
    }

    /// Drop `owner`'s mask on `id`. Returns `true` if `owner` had masked it.
    /// The weight comes back only once no owner masks it.
    pub fn reveal(&self, id: ValidatorId, owner: MaskOwner) -> bool {
        let mut state = self.state.write();
        let Some(owners) = state.masked.get_mut(&id) else {
            return false;
        };
        if !owners.remove(&owner) {
            return false;
        }
        if owners.is_empty() {
            state.masked.remove(&id);
            if let Some(weight) = state.weights.get(&id).copied() {
                state.masked_weight -= weight;
                state.total_weight += weight;
            }
        }
        true
    }

    /// Atomically replace the membership with `validators`.
    ///
    /// Zero weights are skipped. A duplicate id or a total that would overflow
    /// rejects the whole list and leaves the set untouched. Masks persist.
    pub fn set(&self, validators: &[Validator]) -> ValidatorResult<()> {
        let mut weights = HashMap::with_capacity(validators.len());
        let mut sum: u64 = 0;
        for vdr in validators {
            if vdr.weight == 0 {
                continue;
            }
            if weights.insert(vdr.id, vdr.weight).is_some() {
                return Err(ValidatorError::Duplicate(vdr.id));
            }
            sum = sum
                .checked_add(vdr.weight)
                .ok_or(ValidatorError::WeightOverflow)?;
        }

        let mut state = self.state.write();
        let masked_weight: u64 = weights
            .iter()
            .filter(|(id, _)| state.masked.contains_key(*id))
            .map(|(_, w)| *w)
            .sum();
        state.total_weight = sum - masked_weight;
        state.masked_weight = masked_weight;
        state.weights = weights;
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Weight of `id`, zero if absent or masked.
    pub fn weight_of(&self, id: &ValidatorId) -> u64 {
        let state = self.state.read();
        if state.masked.contains_key(id) {
            return 0;
        }
        state.weights.get(id).copied().unwrap_or(0)
    }

    /// Weight of `id` ignoring any mask.
    pub fn weight_including_masked(&self, id: &ValidatorId) -> u64 {
        self.state.read().weights.get(id).copied().unwrap_or(0)
    }

    /// True if `id` is an unmasked member.
    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.state.read().is_visible(id)
    }

    /// True if any owner currently masks `id`.
    pub fn is_masked(&self, id: &ValidatorId) -> bool {
        self.state.read().masked.contains_key(id)
    }

    /// True if `owner` currently masks `id`.
    pub fn is_masked_by(&self, id: &ValidatorId, owner: MaskOwner) -> bool {
        self.state
            .read()
            .masked
            .get(id)
            .is_some_and(|owners| owners.contains(&owner))
    }

    /// Number of unmasked members.
    pub fn len(&self) -> usize {
        let state = self.state.read();
        state
            .weights
            .keys()
            .filter(|id| !state.masked.contains_key(*id))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of unmasked weights.
    pub fn total_weight(&self) -> u64 {
        self.state.read().total_weight
    }

    /// Sum of all member weights, masked ones included.
    pub fn total_weight_with_masked(&self) -> u64 {
        let state = self.state.read();
        state.total_weight + state.masked_weight
    }

    /// Sum of the unmasked weights of `ids`. Unknown ids count as zero.
    pub fn subset_weight<'a, I>(&self, ids: I) -> u64
    where
        I: IntoIterator<Item = &'a ValidatorId>,
    {
        let state = self.state.read();
        ids.into_iter()
            .filter(|id| !state.masked.contains_key(*id))
            .filter_map(|id| state.weights.get(id))
            .sum()
    }

    /// Snapshot of unmasked members ordered by id.
    pub fn list(&self) -> Vec<Validator> {
        self.state
            .read()
            .sorted_unmasked()
            .into_iter()
            .map(|(id, weight)| Validator::new(id, weight))
            .collect()
    }

    /// Draw `k` distinct unmasked validators proportionally to weight.
    pub fn sample(&self, k: usize, seed: SampleSeed) -> ValidatorResult<Vec<ValidatorId>> {
        let candidates = self.state.read().sorted_unmasked();
        sample_weighted(&candidates, k, seed)
    }
}

impl Clone for ValidatorSet {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.state.read().clone()),
        }
    }
}

impl fmt::Display for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let members = state.sorted_unmasked();
        write!(
            f,
            "Validator Set: (Size = {}, Weight = {})",
            members.len(),
            state.total_weight
        )?;
        for (i, (id, weight)) in members.iter().enumerate() {
            write!(f, "\n    Validator[{}]: {}, {}", i, id, weight)?;
        }
        Ok(())
    }
}
