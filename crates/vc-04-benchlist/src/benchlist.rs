//! # Benchlist
//!
//! Tracks consecutive request failures per validator. A validator that has
//! failed `threshold` times in a row, over at least
//! `minimum_failing_duration`, is benched for a period drawn from
//! `[duration / 2, duration]`. While benched its weight is masked in the
//! shared validator set, so samplers and the throttler stop counting it.
//!
//! The total weight on the bench never exceeds
//! `max_portion × (unmasked + masked weight)`. A bench attempt that would
//! break that bound clears the streak and leaves the validator in place.
//!
//! A background sweeper sleeps until the earliest release time, unbenches
//! every expired entry and reveals its weight again.
//!
//! ## Locking
//!
//! One lock guards streaks and the bench queue. It is taken before the
//! validator set's lock, never after, and is released before any
//! [`Benchable`] callback runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use shared_types::{ChainId, ValidatorId};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use vc_01_validators::{MaskOwner, ValidatorSet};

use crate::benchable::Benchable;
use crate::config::BenchlistConfig;
use crate::error::{BenchlistError, BenchlistResult};
use crate::metrics;
use crate::queue::{BenchEntry, BenchQueue};

/// Consecutive failures of one validator that is not benched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureStreak {
    pub consecutive: u32,
    pub first_failure: Instant,
}

#[derive(Default)]
struct BenchState {
    failure_streaks: HashMap<ValidatorId, FailureStreak>,
    queue: BenchQueue,
    benched_weight: u64,
}

struct Shared {
    chain_id: ChainId,
    config: BenchlistConfig,
    benchable: Arc<dyn Benchable>,
    validators: Arc<ValidatorSet>,
    state: Mutex<BenchState>,
    /// Wakes the sweeper when a new entry may have moved the next deadline.
    wake: Notify,
}

/// Per-chain benchlist.
pub struct Benchlist {
    shared: Arc<Shared>,
    sweeper: JoinHandle<()>,
}

impl Benchlist {
    /// Create a benchlist and start its expiry sweeper on the current Tokio
    /// runtime. The sweeper stops when the benchlist is dropped.
    pub fn new(
        chain_id: ChainId,
        config: BenchlistConfig,
        benchable: Arc<dyn Benchable>,
        validators: Arc<ValidatorSet>,
    ) -> BenchlistResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| BenchlistError::NoRuntime)?;

        let shared = Arc::new(Shared {
            chain_id,
            config,
            benchable,
            validators,
            state: Mutex::new(BenchState::default()),
            wake: Notify::new(),
        });
        let sweeper = runtime.spawn(sweep(Arc::clone(&shared)));

        info!(
            chain = %chain_id,
            threshold = shared.config.threshold,
            max_portion = shared.config.max_portion,
            "[vc-04] Benchlist started"
        );
        Ok(Self { shared, sweeper })
    }

    pub fn chain_id(&self) -> ChainId {
        self.shared.chain_id
    }

    pub fn config(&self) -> &BenchlistConfig {
        &self.shared.config
    }

    /// Record a failed request to `validator`. Ignored while it is benched.
    pub fn register_failure(&self, validator: ValidatorId) {
        let shared = &self.shared;
        let now = Instant::now();
        let mut state = shared.state.lock();
        if state.queue.contains(&validator) {
            return;
        }

        let streak = state
            .failure_streaks
            .entry(validator)
            .or_insert(FailureStreak {
                consecutive: 0,
                first_failure: now,
            });
        streak.consecutive = streak.consecutive.saturating_add(1);
        let ready = streak.consecutive >= shared.config.threshold
            && now.duration_since(streak.first_failure) >= shared.config.minimum_failing_duration;
        if !ready {
            return;
        }

        // Benched or not, the streak ends here.
        state.failure_streaks.remove(&validator);
        let Some(benched_until) = shared.try_bench(&mut state, validator, now) else {
            return;
        };
        let (count, weight) = (state.queue.len(), state.benched_weight);
        drop(state);

        shared.wake.notify_one();
        metrics::record_benched(count, weight);
        info!(
            chain = %shared.chain_id,
            validator = %validator,
            for_secs = benched_until.duration_since(now).as_secs(),
            "[vc-04] Validator benched"
        );
        shared.benchable.benched(shared.chain_id, validator);
    }

    /// Record a successful response from `validator`, ending any streak.
    pub fn register_response(&self, validator: ValidatorId) {
        self.shared.state.lock().failure_streaks.remove(&validator);
    }

    pub fn is_benched(&self, validator: &ValidatorId) -> bool {
        self.shared.state.lock().queue.contains(validator)
    }

    /// Currently benched validators, sorted by id.
    pub fn benched(&self) -> Vec<ValidatorId> {
        self.shared.state.lock().queue.validators()
    }

    pub fn benched_until(&self, validator: &ValidatorId) -> Option<Instant> {
        self.shared.state.lock().queue.benched_until(validator)
    }

    /// Total weight currently on the bench.
    pub fn benched_weight(&self) -> u64 {
        self.shared.state.lock().benched_weight
    }

    pub fn failure_streak(&self, validator: &ValidatorId) -> Option<FailureStreak> {
        self.shared
            .state
            .lock()
            .failure_streaks
            .get(validator)
            .copied()
    }
}

impl Drop for Benchlist {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

impl Shared {
    /// Bench `validator` if it has stake and the bench has room for it.
    fn try_bench(
        &self,
        state: &mut BenchState,
        validator: ValidatorId,
        now: Instant,
    ) -> Option<Instant> {
        let weight = self.validators.weight_of(&validator);
        if weight == 0 {
            debug!(validator = %validator, "[vc-04] Not benching peer without stake");
            return None;
        }

        let new_benched = state.benched_weight.saturating_add(weight);
        let max_benched = self.config.max_portion * self.validators.total_weight_with_masked() as f64;
        if new_benched as f64 > max_benched {
            debug!(
                validator = %validator,
                weight,
                benched_weight = state.benched_weight,
                max_benched,
                "[vc-04] Bench rejected: too much stake already benched"
            );
            return None;
        }

        let benched_until = now + self.bench_period();
        state.queue.push(BenchEntry {
            benched_until,
            validator,
            weight,
        });
        state.benched_weight = new_benched;
        self.validators.mask(validator, MaskOwner::Benchlist);
        Some(benched_until)
    }

    fn bench_period(&self) -> Duration {
        let max = self.config.duration;
        rand::thread_rng().gen_range(max / 2..=max)
    }

    fn unbench_expired(&self) {
        let now = Instant::now();
        let (expired, count, weight) = {
            let mut state = self.state.lock();
            let expired = state.queue.pop_expired(now);
            if expired.is_empty() {
                return;
            }
            for entry in &expired {
                state.benched_weight = state.benched_weight.saturating_sub(entry.weight);
                self.validators.reveal(entry.validator, MaskOwner::Benchlist);
            }
            (expired, state.queue.len(), state.benched_weight)
        };

        metrics::record_benched(count, weight);
        for entry in expired {
            info!(
                chain = %self.chain_id,
                validator = %entry.validator,
                "[vc-04] Validator unbenched"
            );
            self.benchable.unbenched(self.chain_id, entry.validator);
        }
    }
}

async fn sweep(shared: Arc<Shared>) {
    loop {
        let deadline = shared.state.lock().queue.next_deadline();
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = time::sleep_until(deadline) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            None => shared.wake.notified().await,
        }
        shared.unbench_expired();
    }
}
