//! Vote bookkeeping for a single poll round.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use shared_types::ValidatorId;

/// Polled validators, each with the number of times it was sampled.
#[derive(Debug, Clone, Default)]
pub struct VoterBag {
    counts: HashMap<ValidatorId, usize>,
    len: usize,
}

impl VoterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: ValidatorId) {
        *self.counts.entry(id).or_insert(0) += 1;
        self.len += 1;
    }

    /// Take every sample of `id` out of the bag. Returns the count removed.
    pub fn take(&mut self, id: &ValidatorId) -> usize {
        let count = self.counts.remove(id).unwrap_or(0);
        self.len -= count;
        count
    }

    pub fn count(&self, id: &ValidatorId) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Total samples still in the bag.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<ValidatorId> for VoterBag {
    fn from_iter<I: IntoIterator<Item = ValidatorId>>(iter: I) -> Self {
        let mut bag = Self::new();
        for id in iter {
            bag.add(id);
        }
        bag
    }
}

/// One outcome with its supporting voters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeVotes<T> {
    pub outcome: T,
    /// Voters in the order their votes arrived.
    pub voters: Vec<ValidatorId>,
    /// Sum of the voters' sample counts.
    pub count: usize,
}

/// Aggregate `outcome -> voters` for a round, in first-vote order.
///
/// Adding a vote and reading the leading count are both O(1).
#[derive(Debug, Clone)]
pub struct Tally<T> {
    entries: Vec<OutcomeVotes<T>>,
    /// Position of each outcome in `entries`.
    index: HashMap<T, usize>,
    received: usize,
    max_count: usize,
}

impl<T> Default for Tally<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            received: 0,
            max_count: 0,
        }
    }
}

impl<T: PartialEq> PartialEq for Tally<T> {
    fn eq(&self, other: &Self) -> bool {
        self.received == other.received && self.entries == other.entries
    }
}

impl<T: Eq> Eq for Tally<T> {}

impl<T: Clone + Eq + Hash> Tally<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `outcome` with `count` samples from `voter`.
    pub fn add(&mut self, outcome: T, voter: ValidatorId, count: usize) {
        self.received += count;
        let total = match self.index.get(&outcome) {
            Some(&at) => {
                let entry = &mut self.entries[at];
                entry.voters.push(voter);
                entry.count += count;
                entry.count
            }
            None => {
                self.index.insert(outcome.clone(), self.entries.len());
                self.entries.push(OutcomeVotes {
                    outcome,
                    voters: vec![voter],
                    count,
                });
                count
            }
        };
        self.max_count = self.max_count.max(total);
    }

    /// Highest count of any single outcome.
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Samples received so far across all outcomes.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn count(&self, outcome: &T) -> usize {
        self.get(outcome).map(|e| e.count).unwrap_or(0)
    }

    pub fn voters(&self, outcome: &T) -> &[ValidatorId] {
        self.get(outcome).map(|e| e.voters.as_slice()).unwrap_or(&[])
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.outcome)
    }

    pub fn entries(&self) -> &[OutcomeVotes<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, outcome: &T) -> Option<&OutcomeVotes<T>> {
        self.index.get(outcome).map(|&at| &self.entries[at])
    }
}

impl<T: fmt::Debug> fmt::Display for Tally<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tally: (Size = {})", self.entries.len())?;
        for entry in &self.entries {
            write!(f, "\n    {:?}: Count = {}", entry.outcome, entry.count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vdr(n: u8) -> ValidatorId {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        ValidatorId::new(bytes)
    }

    #[test]
    fn test_voter_bag_counts_repeats() {
        let mut bag: VoterBag = [vdr(1), vdr(1), vdr(2)].into_iter().collect();
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.count(&vdr(1)), 2);

        assert_eq!(bag.take(&vdr(1)), 2);
        assert_eq!(bag.take(&vdr(1)), 0);
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_tally_keeps_first_vote_order() {
        let mut tally = Tally::new();
        tally.add("b", vdr(1), 1);
        tally.add("a", vdr(2), 1);
        tally.add("b", vdr(3), 2);

        let outcomes: Vec<_> = tally.outcomes().copied().collect();
        assert_eq!(outcomes, vec!["b", "a"]);
        assert_eq!(tally.count(&"b"), 3);
        assert_eq!(tally.voters(&"b"), &[vdr(1), vdr(3)]);
        assert_eq!(tally.max_count(), 3);
        assert_eq!(tally.received(), 4);
        assert!(tally.voters(&"z").is_empty());
    }

    #[test]
    fn test_tally_leading_count_over_many_outcomes() {
        let mut tally = Tally::new();
        for n in 0..200u32 {
            tally.add(n, vdr((n % 250) as u8), 1);
        }
        assert_eq!(tally.len(), 200);
        assert_eq!(tally.max_count(), 1);

        tally.add(150, vdr(1), 2);
        tally.add(7, vdr(2), 1);
        assert_eq!(tally.max_count(), 3);
        assert_eq!(tally.count(&150), 3);
        assert_eq!(tally.count(&7), 2);
        assert_eq!(tally.received(), 203);
        assert_eq!(tally.outcomes().next(), Some(&0));
    }

    #[test]
    fn test_tallies_compare_by_votes() {
        let mut first = Tally::new();
        let mut second = Tally::new();
        first.add("a", vdr(1), 1);
        second.add("a", vdr(1), 1);
        assert_eq!(first, second);

        second.add("b", vdr(2), 1);
        assert_ne!(first, second);
    }
}
