//! Benched validators ordered by release time.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use shared_types::ValidatorId;
use tokio::time::Instant;

/// A benched validator and the weight it had when benched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BenchEntry {
    pub benched_until: Instant,
    pub validator: ValidatorId,
    pub weight: u64,
}

/// Min-heap on `benched_until` plus a membership index.
#[derive(Debug, Default)]
pub struct BenchQueue {
    heap: BinaryHeap<Reverse<BenchEntry>>,
    members: HashMap<ValidatorId, Instant>,
}

impl BenchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `entry.validator` is already benched.
    pub fn push(&mut self, entry: BenchEntry) -> bool {
        if self.members.contains_key(&entry.validator) {
            return false;
        }
        self.members.insert(entry.validator, entry.benched_until);
        self.heap.push(Reverse(entry));
        true
    }

    pub fn contains(&self, validator: &ValidatorId) -> bool {
        self.members.contains_key(validator)
    }

    pub fn benched_until(&self, validator: &ValidatorId) -> Option<Instant> {
        self.members.get(validator).copied()
    }

    /// Earliest release time.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.benched_until)
    }

    /// Remove and return every entry due at or before `now`, earliest first.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<BenchEntry> {
        let mut expired = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.benched_until > now {
                break;
            }
            let entry = *entry;
            self.heap.pop();
            self.members.remove(&entry.validator);
            expired.push(entry);
        }
        expired
    }

    /// Benched ids, sorted.
    pub fn validators(&self) -> Vec<ValidatorId> {
        let mut ids: Vec<_> = self.members.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
