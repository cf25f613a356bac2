//! # Poll Set
//!
//! Outstanding polls keyed by request id. Results are handed back strictly
//! in creation order: a finished poll is only returned once every older poll
//! has finished too.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::time::Instant;

use shared_types::ValidatorId;
use tracing::debug;

use crate::bag::Tally;
use crate::early_term::{Poll, PollFactory};
use crate::error::PollResult;
use crate::metrics;

struct PollEntry<T> {
    poll: Poll<T>,
    started: Instant,
}

/// Collection of outstanding polls.
pub struct PollSet<T> {
    factory: PollFactory,
    polls: HashMap<u32, PollEntry<T>>,
    /// Request ids, oldest first.
    order: VecDeque<u32>,
}

impl<T: Clone + Eq + Hash> PollSet<T> {
    pub fn new(factory: PollFactory) -> Self {
        Self {
            factory,
            polls: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Start a poll for `request_id`. Returns `false` if the id is in use.
    pub fn add<I>(&mut self, request_id: u32, voters: I) -> PollResult<bool>
    where
        I: IntoIterator<Item = ValidatorId>,
    {
        if self.polls.contains_key(&request_id) {
            debug!(request_id, "[vc-02] Dropping poll with duplicate request id");
            return Ok(false);
        }

        let poll = self.factory.new_poll(voters)?;
        debug!(
            request_id,
            voters = poll.outstanding(),
            "[vc-02] Poll created"
        );
        metrics::record_poll_created();
        self.polls.insert(
            request_id,
            PollEntry {
                poll,
                started: Instant::now(),
            },
        );
        self.order.push_back(request_id);
        Ok(true)
    }

    /// Apply a vote and return every newly deliverable result.
    pub fn vote(&mut self, request_id: u32, id: ValidatorId, outcome: T) -> Vec<Tally<T>> {
        let Some(entry) = self.polls.get_mut(&request_id) else {
            debug!(request_id, validator = %id, "[vc-02] Vote for unknown poll");
            return Vec::new();
        };
        entry.poll.vote(id, outcome);
        if !entry.poll.finished() {
            return Vec::new();
        }
        self.drain_finished()
    }

    /// Apply a dropped response and return every newly deliverable result.
    pub fn drop_vote(&mut self, request_id: u32, id: ValidatorId) -> Vec<Tally<T>> {
        let Some(entry) = self.polls.get_mut(&request_id) else {
            debug!(request_id, validator = %id, "[vc-02] Drop for unknown poll");
            return Vec::new();
        };
        entry.poll.drop_vote(id);
        if !entry.poll.finished() {
            return Vec::new();
        }
        self.drain_finished()
    }

    /// Number of polls not yet returned.
    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }

    fn drain_finished(&mut self) -> Vec<Tally<T>> {
        let mut results = Vec::new();
        while let Some(request_id) = self.order.front().copied() {
            let finished = self
                .polls
                .get(&request_id)
                .map(|entry| entry.poll.finished())
                .unwrap_or(true);
            if !finished {
                break;
            }
            self.order.pop_front();
            if let Some(entry) = self.polls.remove(&request_id) {
                let elapsed = entry.started.elapsed();
                debug!(
                    request_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "[vc-02] Poll finished"
                );
                metrics::record_poll_finished(elapsed.as_secs_f64());
                results.push(entry.poll.into_result());
            }
        }
        results
    }
}

impl<T: fmt::Debug> fmt::Display for PollSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "current polls: (Size = {})", self.polls.len())?;
        for request_id in &self.order {
            if let Some(entry) = self.polls.get(request_id) {
                write!(f, "\n    RequestID {}:\n        {}", request_id, entry.poll)?;
            }
        }
        Ok(())
    }
}
