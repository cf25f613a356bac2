//! # Coordinator
//!
//! Wires the four subsystems around one live validator set:
//!
//! ```text
//!                    ┌──────────────────────┐
//!   source ────────→ │ ValidatorManager     │
//!                    │   live set (Arc)     │
//!                    └──┬───────┬───────┬───┘
//!              sample   │ mask/ │ share │
//!                       ↓ reveal↓       ↓
//!                  PollSet  Benchlist  Throttler
//! ```
//!
//! Benching masks a validator in the live set, so the next poll sample and
//! the throttler's stake shares stop counting it at once.

use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{BlockId, ChainId, ValidatorId};
use thiserror::Error;
use tracing::{debug, info};
use vc_01_validators::{
    SampleSeed, ValidatorError, ValidatorManager, ValidatorSet, ValidatorSource,
};
use vc_02_poll::{PollError, PollFactory, PollSet, Tally};
use vc_03_throttling::{InboundMsgByteThrottler, InboundMsgThrottler};
use vc_04_benchlist::{Benchable, Benchlist};

use crate::config::{ConfigError, NodeConfig};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validators(#[from] ValidatorError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Request {0} already has an open poll")]
    DuplicateRequest(u32),
}

/// Benchable that only logs. Used when no chain router is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBenchable;

impl Benchable for TracingBenchable {
    fn benched(&self, chain_id: ChainId, validator: ValidatorId) {
        debug!(chain = %chain_id, validator = %validator, "[node] Router notified of bench");
    }

    fn unbenched(&self, chain_id: ChainId, validator: ValidatorId) {
        debug!(chain = %chain_id, validator = %validator, "[node] Router notified of unbench");
    }
}

/// The validator coordination layer of one chain.
pub struct Coordinator {
    manager: Arc<ValidatorManager>,
    sample_size: usize,
    polls: Mutex<PollSet<BlockId>>,
    throttler: Arc<InboundMsgByteThrottler>,
    benchlist: Benchlist,
}

impl Coordinator {
    /// Build every subsystem from `config`. Must run inside a Tokio runtime.
    ///
    /// Without a `source` the manager serves the configured default set.
    pub fn new(
        config: &NodeConfig,
        source: Option<Arc<dyn ValidatorSource>>,
        benchable: Arc<dyn Benchable>,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;

        let network = config.validators.network();
        let defaults = config.validators.build()?;
        let manager = match source {
            Some(source) => ValidatorManager::with_source(
                network,
                defaults,
                source,
                config.manager_config(),
            )?,
            None => ValidatorManager::new(network, defaults),
        };
        let manager = Arc::new(manager);
        let live = manager.live_set();

        let factory = PollFactory::from_config(&config.poll)?;
        let throttler = InboundMsgByteThrottler::new(config.throttler, Arc::clone(&live))
            .map_err(ConfigError::from)?;
        let benchlist = Benchlist::new(
            config.chain_id,
            config.benchlist.to_config(),
            benchable,
            live,
        )
        .map_err(ConfigError::from)?;

        info!(
            network = network.as_u32(),
            chain = %config.chain_id,
            validators = manager.live_set().len(),
            k = config.poll.k,
            alpha = config.poll.alpha,
            "[node] Coordinator ready"
        );

        Ok(Self {
            manager,
            sample_size: config.poll.k,
            polls: Mutex::new(PollSet::new(factory)),
            throttler: Arc::new(throttler),
            benchlist,
        })
    }

    pub fn manager(&self) -> &Arc<ValidatorManager> {
        &self.manager
    }

    pub fn live_set(&self) -> Arc<ValidatorSet> {
        self.manager.live_set()
    }

    pub fn throttler(&self) -> &Arc<InboundMsgByteThrottler> {
        &self.throttler
    }

    pub fn benchlist(&self) -> &Benchlist {
        &self.benchlist
    }

    /// Refresh the live set from the source, if any.
    pub async fn refresh_validators(&self) -> Result<Arc<ValidatorSet>, CoordinatorError> {
        Ok(self.manager.get_validators().await?)
    }

    /// Sample up to `k` unmasked validators by weight and open a poll over
    /// them under `request_id`. Returns the sampled voters.
    pub fn start_poll(
        &self,
        request_id: u32,
        seed: SampleSeed,
    ) -> Result<Vec<ValidatorId>, CoordinatorError> {
        let live = self.manager.live_set();
        let k = self.sample_size.min(live.len());
        let voters = live.sample(k, seed)?;

        let added = self.polls.lock().add(request_id, voters.iter().copied())?;
        if !added {
            return Err(CoordinatorError::DuplicateRequest(request_id));
        }
        debug!(request_id, voters = voters.len(), "[node] Poll started");
        Ok(voters)
    }

    /// A voter answered. Ends its failure streak and returns any polls that
    /// are now deliverable, oldest first.
    pub fn record_vote(
        &self,
        request_id: u32,
        voter: ValidatorId,
        outcome: BlockId,
    ) -> Vec<Tally<BlockId>> {
        self.benchlist.register_response(voter);
        self.polls.lock().vote(request_id, voter, outcome)
    }

    /// A voter failed to answer. Counts towards benching it and returns any
    /// polls that are now deliverable, oldest first.
    pub fn record_failure(&self, request_id: u32, voter: ValidatorId) -> Vec<Tally<BlockId>> {
        self.benchlist.register_failure(voter);
        self.polls.lock().drop_vote(request_id, voter)
    }

    pub fn open_polls(&self) -> usize {
        self.polls.lock().len()
    }

    /// Suspend until the throttler admits `msg_size` bytes from `peer`.
    pub async fn admit(&self, msg_size: u64, peer: ValidatorId) {
        self.throttler.acquire(msg_size, peer).await
    }

    /// The message from `peer` has been processed.
    pub fn processed(&self, msg_size: u64, peer: ValidatorId) {
        self.throttler.release(msg_size, peer)
    }

    /// `peer` disconnected. Frees its bytes and aborts its waiting messages.
    pub fn disconnected(&self, peer: ValidatorId) {
        self.throttler.release_all(peer)
    }

    /// The throttler behind its port, for the inbound message pipeline.
    pub fn inbound_throttler(&self) -> Arc<dyn InboundMsgThrottler> {
        self.throttler.clone()
    }
}
