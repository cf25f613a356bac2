//! # Early-Terminating Poll
//!
//! One voting round over a bag of polled validators. No ancestry traversal
//! is performed: only direct votes for an outcome count toward it.
//!
//! ## Termination
//!
//! The poll is finished as soon as any of these hold:
//!
//! 1. every polled validator has voted or been dropped,
//! 2. some outcome has at least `alpha` votes,
//! 3. votes received plus votes outstanding is below `alpha`, so no outcome
//!    can reach it anymore.
//!
//! Once finished, a poll never reopens and ignores further input.

use std::fmt;
use std::hash::Hash;

use shared_types::ValidatorId;
use tracing::trace;

use crate::bag::{Tally, VoterBag};
use crate::config::PollConfig;
use crate::error::{PollError, PollResult};

/// Creates polls with a fixed `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFactory {
    alpha: usize,
}

impl PollFactory {
    pub fn new(alpha: usize) -> PollResult<Self> {
        if alpha == 0 {
            return Err(PollError::InvalidAlpha { alpha });
        }
        Ok(Self { alpha })
    }

    pub fn from_config(config: &PollConfig) -> PollResult<Self> {
        config.validate()?;
        Self::new(config.alpha)
    }

    pub fn alpha(&self) -> usize {
        self.alpha
    }

    /// Start a poll over `voters`. Repeated ids count once per occurrence.
    pub fn new_poll<T, I>(&self, voters: I) -> PollResult<Poll<T>>
    where
        T: Clone + Eq + Hash,
        I: IntoIterator<Item = ValidatorId>,
    {
        let polled: VoterBag = voters.into_iter().collect();
        if self.alpha > polled.len() {
            return Err(PollError::AlphaExceedsVoters {
                alpha: self.alpha,
                voters: polled.len(),
            });
        }
        Ok(Poll {
            polled,
            alpha: self.alpha,
            votes: Tally::new(),
            finished: false,
        })
    }
}

/// An outstanding poll.
#[derive(Debug, Clone)]
pub struct Poll<T> {
    polled: VoterBag,
    alpha: usize,
    votes: Tally<T>,
    finished: bool,
}

impl<T: Clone + Eq + Hash> Poll<T> {
    /// Record `id`'s vote for `outcome`.
    ///
    /// No-op if `id` was not polled, already answered, or the poll is over.
    pub fn vote(&mut self, id: ValidatorId, outcome: T) {
        if self.finished {
            return;
        }
        let count = self.polled.take(&id);
        if count == 0 {
            trace!(validator = %id, "[vc-02] Ignoring vote from unpolled or repeat voter");
            return;
        }
        self.votes.add(outcome, id, count);
        self.update_finished();
    }

    /// Record that `id` will not answer. Same no-op rules as `vote`.
    pub fn drop_vote(&mut self, id: ValidatorId) {
        if self.finished {
            return;
        }
        if self.polled.take(&id) == 0 {
            return;
        }
        self.update_finished();
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Votes collected so far. Callers check `finished` before acting on it.
    pub fn result(&self) -> &Tally<T> {
        &self.votes
    }

    pub fn into_result(self) -> Tally<T> {
        self.votes
    }

    /// Samples still awaited.
    pub fn outstanding(&self) -> usize {
        self.polled.len()
    }

    pub fn alpha(&self) -> usize {
        self.alpha
    }

    fn update_finished(&mut self) {
        let remaining = self.polled.len();
        let received = self.votes.received();
        self.finished = remaining == 0
            || self.votes.max_count() >= self.alpha
            || received + remaining < self.alpha;
    }
}

impl<T: fmt::Debug> fmt::Display for Poll<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waiting on {} voters (alpha = {})\nreceived {}",
            self.polled.len(),
            self.alpha,
            self.votes
        )
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

    const X: u8 = 1;
    const Y: u8 = 2;
    const Z: u8 = 3;

    #[test]
    fn test_zero_alpha_rejected() {
        assert_eq!(
            PollFactory::new(0).unwrap_err(),
            PollError::InvalidAlpha { alpha: 0 }
        );
    }

    #[test]
    fn test_alpha_above_voters_rejected() {
        let factory = PollFactory::new(3).unwrap();
        let err = factory.new_poll::<u8, _>([vdr(1), vdr(2)]).unwrap_err();
        assert_eq!(err, PollError::AlphaExceedsVoters { alpha: 3, voters: 2 });
    }

    #[test]
    fn test_single_voter_result() {
        let factory = PollFactory::new(1).unwrap();
        let mut poll = factory.new_poll([vdr(1)]).unwrap();

        poll.vote(vdr(1), X);
        assert!(poll.finished());

        let result = poll.result();
        assert_eq!(result.len(), 1);
        assert_eq!(result.voters(&X), &[vdr(1)]);
    }

    #[test]
    fn test_duplicate_votes_dropped() {
        let factory = PollFactory::new(2).unwrap();
        let mut poll = factory.new_poll([vdr(1), vdr(2)]).unwrap();

        poll.vote(vdr(1), X);
        assert!(!poll.finished());
        poll.vote(vdr(1), X);
        assert!(!poll.finished());
        poll.vote(vdr(2), X);
        assert!(poll.finished());
        assert_eq!(poll.result().count(&X), 2);
    }

    #[test]
    fn test_alpha_equals_k_waits_for_last_vote() {
        let factory = PollFactory::new(4).unwrap();
        let mut poll = factory
            .new_poll([vdr(1), vdr(2), vdr(3), vdr(4)])
            .unwrap();

        for i in 1..=3 {
            poll.vote(vdr(i), X);
            assert!(!poll.finished());
        }
        poll.vote(vdr(4), X);
        assert!(poll.finished());
    }

    #[test]
    fn test_terminates_early_on_alpha() {
        let factory = PollFactory::new(3).unwrap();
        let mut poll = factory
            .new_poll([vdr(1), vdr(2), vdr(3), vdr(4), vdr(5)])
            .unwrap();

        poll.vote(vdr(1), X);
        poll.vote(vdr(2), X);
        assert!(!poll.finished());
        poll.vote(vdr(3), X);
        assert!(poll.finished());
        assert_eq!(poll.outstanding(), 2);
    }

    #[test]
    fn test_split_vote_finishes_by_exhaustion() {
        let factory = PollFactory::new(2).unwrap();
        let mut poll = factory.new_poll([vdr(1), vdr(2), vdr(3)]).unwrap();

        poll.vote(vdr(1), X);
        poll.vote(vdr(2), Y);
        assert!(!poll.finished());
        poll.vote(vdr(3), Z);
        assert!(poll.finished());
        assert_eq!(poll.result().max_count(), 1);
    }

    #[test]
    fn test_fast_drops() {
        let factory = PollFactory::new(2).unwrap();
        let mut poll = factory.new_poll::<u8, _>([vdr(1), vdr(2), vdr(3)]).unwrap();

        poll.drop_vote(vdr(1));
        assert!(!poll.finished());
        poll.drop_vote(vdr(2));
        assert!(poll.finished());
        assert!(poll.result().is_empty());
    }

    #[test]
    fn test_ineligible_voter_ignored() {
        let factory = PollFactory::new(1).unwrap();
        let mut poll = factory.new_poll([vdr(1)]).unwrap();

        poll.vote(vdr(9), X);
        assert!(!poll.finished());
        assert!(poll.result().is_empty());
    }

    #[test]
    fn test_finished_poll_ignores_input() {
        let factory = PollFactory::new(1).unwrap();
        let mut poll = factory.new_poll([vdr(1), vdr(2)]).unwrap();

        poll.vote(vdr(1), X);
        assert!(poll.finished());
        poll.vote(vdr(2), Y);
        assert!(poll.finished());
        assert_eq!(poll.result().len(), 1);
        assert_eq!(poll.outstanding(), 1);
    }

    #[test]
    fn test_repeated_sample_counts_twice() {
        let factory = PollFactory::new(2).unwrap();
        let mut poll = factory.new_poll([vdr(1), vdr(1), vdr(2)]).unwrap();

        poll.vote(vdr(1), X);
        assert!(poll.finished());
        assert_eq!(poll.result().count(&X), 2);
    }

    #[test]
    fn test_display() {
        let factory = PollFactory::new(2).unwrap();
        let mut poll = factory.new_poll([vdr(1), vdr(2)]).unwrap();
        poll.vote(vdr(1), X);

        let text = poll.to_string();
        assert!(text.starts_with("waiting on 1 voters (alpha = 2)"));
        assert!(text.contains("Count = 1"));
    }
}
