//! Stake-weighted sampling without replacement.
//!
//! Candidates are visited in id order so a deterministic seed always yields
//! the same sample for the same membership.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use shared_types::ValidatorId;

use crate::error::{ValidatorError, ValidatorResult};

/// Randomness used for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSeed {
    /// Reproducible draws, used for consensus polling.
    Deterministic(u64),
    /// Operating-system entropy, used for gossip fan-out.
    Secure,
}

/// Draw `k` distinct validators, each draw proportional to remaining weight.
///
/// `candidates` must already be sorted by id and hold only non-zero weights.
pub fn sample_weighted(
    candidates: &[(ValidatorId, u64)],
    k: usize,
    seed: SampleSeed,
) -> ValidatorResult<Vec<ValidatorId>> {
    if k > candidates.len() {
        return Err(ValidatorError::InsufficientValidators {
            requested: k,
            available: candidates.len(),
        });
    }

    match seed {
        SampleSeed::Deterministic(s) => draw(candidates, k, &mut StdRng::seed_from_u64(s)),
        SampleSeed::Secure => draw(candidates, k, &mut OsRng),
    }
}

fn draw<R: Rng>(
    candidates: &[(ValidatorId, u64)],
    k: usize,
    rng: &mut R,
) -> ValidatorResult<Vec<ValidatorId>> {
    let mut pool: Vec<(ValidatorId, u64)> = candidates.to_vec();
    // Sum fits: the set keeps its total overflow-checked.
    let mut remaining: u64 = pool.iter().map(|(_, w)| *w).sum();
    let mut picked = Vec::with_capacity(k);

    for _ in 0..k {
        if remaining == 0 {
            return Err(ValidatorError::NoValidators);
        }
        let mut target = rng.gen_range(0..remaining);
        let mut index = pool.len() - 1;
        for (i, (_, weight)) in pool.iter().enumerate() {
            if target < *weight {
                index = i;
                break;
            }
            target -= weight;
        }
        let (id, weight) = pool.remove(index);
        remaining -= weight;
        picked.push(id);
    }

    Ok(picked)
}
