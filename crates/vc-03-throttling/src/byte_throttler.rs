//! # Inbound Message Byte Throttler
//!
//! Gates the inbound pipeline on two byte pools:
//!
//! - **at-large**: any peer may draw from it, capped per peer at
//!   `node_max_at_large_bytes`;
//! - **validator**: split among validators in proportion to stake. A peer
//!   with zero unmasked weight has no share.
//!
//! `acquire` takes from the at-large pool first, then from the caller's
//! validator share. Whatever is still missing is queued; the caller suspends
//! until released bytes cover the rest. A peer's requests are served in
//! arrival order: a new request from a peer that already has waiters queues
//! behind them without drawing anything.
//!
//! `release` hands bytes back to the validator pool first. Freed validator
//! bytes go to the releasing peer's own waiters before returning to the
//! pool. Whatever reaches a pool is offered to the oldest waiters across all
//! peers, each limited by its at-large cap and its validator share.
//!
//! ## Ledger Invariants
//!
//! - `remaining_vdr_bytes + Σ vdr_bytes_used == vdr_alloc_size`
//! - `remaining_at_large_bytes + Σ at_large_bytes_used == at_large_alloc_size`
//! - `at_large_bytes_used[peer] <= node_max_at_large_bytes`
//!
//! Bytes granted to a request that is still waiting already count as used.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ValidatorId;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::debug;
use vc_01_validators::ValidatorSet;

use crate::config::{ByteThrottlerConfig, ThrottlerConfigError};
use crate::metrics;

// =============================================================================
// THROTTLER PORT
// =============================================================================

/// Admission gate in front of inbound message processing.
#[async_trait]
pub trait InboundMsgThrottler: Send + Sync {
    /// Suspend until `msg_size` bytes are charged to `node`.
    async fn acquire(&self, msg_size: u64, node: ValidatorId);

    /// Return `msg_size` bytes previously charged to `node`.
    fn release(&self, msg_size: u64, node: ValidatorId);

    /// Return every byte charged to `node` and abort its pending acquires.
    fn release_all(&self, node: ValidatorId);
}

/// Throttler that admits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInboundMsgThrottler;

#[async_trait]
impl InboundMsgThrottler for NoInboundMsgThrottler {
    async fn acquire(&self, _msg_size: u64, _node: ValidatorId) {}

    fn release(&self, _msg_size: u64, _node: ValidatorId) {}

    fn release_all(&self, _node: ValidatorId) {}
}

// =============================================================================
// LEDGER
// =============================================================================

struct WaitingAcquire {
    node: ValidatorId,
    msg_size: u64,
    bytes_needed: u64,
    /// The node's validator share when the request arrived.
    vdr_allocation: u64,
    /// `true` once fully granted, `false` if aborted by `release_all`.
    done: oneshot::Sender<bool>,
}

enum Admission {
    Granted,
    Queued {
        seq: u64,
        rx: oneshot::Receiver<bool>,
    },
}

/// The two byte pools and what each peer holds from them.
struct Pools {
    node_max_at_large_bytes: u64,
    remaining_vdr_bytes: u64,
    remaining_at_large_bytes: u64,
    vdr_bytes_used: HashMap<ValidatorId, u64>,
    at_large_bytes_used: HashMap<ValidatorId, u64>,
}

impl Pools {
    /// Charge up to `wanted` bytes to `node`, at-large first, then its
    /// validator share. Returns the bytes charged.
    fn draw(&mut self, node: ValidatorId, wanted: u64, vdr_allocation: u64) -> u64 {
        let at_large_room = self
            .node_max_at_large_bytes
            .saturating_sub(used(&self.at_large_bytes_used, &node));
        let from_at_large = wanted
            .min(at_large_room)
            .min(self.remaining_at_large_bytes);
        if from_at_large > 0 {
            self.remaining_at_large_bytes -= from_at_large;
            *self.at_large_bytes_used.entry(node).or_insert(0) += from_at_large;
        }

        let vdr_room = vdr_allocation.saturating_sub(used(&self.vdr_bytes_used, &node));
        let from_vdr = (wanted - from_at_large)
            .min(vdr_room)
            .min(self.remaining_vdr_bytes);
        if from_vdr > 0 {
            self.remaining_vdr_bytes -= from_vdr;
            *self.vdr_bytes_used.entry(node).or_insert(0) += from_vdr;
        }
        from_at_large + from_vdr
    }

    fn is_drained(&self) -> bool {
        self.remaining_at_large_bytes == 0 && self.remaining_vdr_bytes == 0
    }
}

struct Ledger {
    pools: Pools,
    /// Every waiting request, oldest first.
    waiting: BTreeMap<u64, WaitingAcquire>,
    /// Per-peer queue of waiting request ids, oldest first.
    node_waiting: HashMap<ValidatorId, VecDeque<u64>>,
    next_seq: u64,
}

fn used(map: &HashMap<ValidatorId, u64>, node: &ValidatorId) -> u64 {
    map.get(node).copied().unwrap_or(0)
}

fn debit(map: &mut HashMap<ValidatorId, u64>, node: ValidatorId, bytes: u64) {
    if let Some(entry) = map.get_mut(&node) {
        *entry -= bytes;
        if *entry == 0 {
            map.remove(&node);
        }
    }
}

impl Ledger {
    fn new(config: &ByteThrottlerConfig) -> Self {
        Self {
            pools: Pools {
                node_max_at_large_bytes: config.node_max_at_large_bytes,
                remaining_vdr_bytes: config.vdr_alloc_size,
                remaining_at_large_bytes: config.at_large_alloc_size,
                vdr_bytes_used: HashMap::new(),
                at_large_bytes_used: HashMap::new(),
            },
            waiting: BTreeMap::new(),
            node_waiting: HashMap::new(),
            next_seq: 0,
        }
    }

    fn admit(&mut self, msg_size: u64, node: ValidatorId, vdr_allocation: u64) -> Admission {
        // A peer with requests already waiting queues behind them uncharged.
        let bytes_needed = if self.node_waiting.contains_key(&node) {
            msg_size
        } else {
            msg_size - self.pools.draw(node, msg_size, vdr_allocation)
        };
        if bytes_needed == 0 {
            return Admission::Granted;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let (done, rx) = oneshot::channel();
        self.waiting.insert(
            seq,
            WaitingAcquire {
                node,
                msg_size,
                bytes_needed,
                vdr_allocation,
                done,
            },
        );
        self.node_waiting.entry(node).or_default().push_back(seq);
        Admission::Queued { seq, rx }
    }

    fn release(&mut self, msg_size: u64, node: ValidatorId) {
        let pools = &mut self.pools;
        let vdr_return = msg_size.min(used(&pools.vdr_bytes_used, &node));
        // Clamped so a stray release never mints bytes.
        let at_large_return = (msg_size - vdr_return).min(used(&pools.at_large_bytes_used, &node));

        if at_large_return > 0 {
            pools.remaining_at_large_bytes += at_large_return;
            debit(&mut pools.at_large_bytes_used, node, at_large_return);
            self.hand_out();
        }

        if vdr_return > 0 {
            let leftover = self.hand_out_own_vdr(node, vdr_return);
            if leftover > 0 {
                debit(&mut self.pools.vdr_bytes_used, node, leftover);
                self.pools.remaining_vdr_bytes += leftover;
                self.hand_out();
            }
        }
    }

    /// Serve waiters from the free pools, oldest first across all peers.
    /// Once a peer's oldest waiter comes up short, its later waiters are
    /// skipped for this pass.
    fn hand_out(&mut self) {
        let mut completed = Vec::new();
        let mut stalled = HashSet::new();
        for (seq, request) in self.waiting.iter_mut() {
            if self.pools.is_drained() {
                break;
            }
            if stalled.contains(&request.node) {
                continue;
            }
            request.bytes_needed -=
                self.pools
                    .draw(request.node, request.bytes_needed, request.vdr_allocation);
            if request.bytes_needed == 0 {
                completed.push(*seq);
            } else {
                stalled.insert(request.node);
            }
        }
        for seq in completed {
            self.complete(seq, true);
        }
    }

    /// Give `bytes` of `node`'s validator share to its own waiters. Returns
    /// what is left over.
    fn hand_out_own_vdr(&mut self, node: ValidatorId, mut bytes: u64) -> u64 {
        while bytes > 0 {
            let Some(seq) = self.node_waiting.get(&node).and_then(|q| q.front().copied()) else {
                break;
            };
            let Some(request) = self.waiting.get_mut(&seq) else {
                break;
            };
            let given = request.bytes_needed.min(bytes);
            request.bytes_needed -= given;
            bytes -= given;
            if request.bytes_needed == 0 {
                self.complete(seq, true);
            }
        }
        bytes
    }

    fn remove_waiting(&mut self, seq: u64) -> Option<WaitingAcquire> {
        let request = self.waiting.remove(&seq)?;
        if let Some(queue) = self.node_waiting.get_mut(&request.node) {
            queue.retain(|s| *s != seq);
            if queue.is_empty() {
                self.node_waiting.remove(&request.node);
            }
        }
        Some(request)
    }

    fn complete(&mut self, seq: u64, granted: bool) {
        if let Some(request) = self.remove_waiting(seq) {
            // Receiver is only dropped under this lock, after it has
            // settled the request itself.
            let _ = request.done.send(granted);
        }
    }

    /// Drop a waiting request and return what it had been granted.
    fn cancel(&mut self, seq: u64) {
        if let Some(request) = self.remove_waiting(seq) {
            let granted = request.msg_size - request.bytes_needed;
            if granted > 0 {
                self.release(granted, request.node);
            }
            // The peer's next request may now be at the head of its queue.
            self.hand_out();
        }
    }

    fn abort_node(&mut self, node: ValidatorId) -> usize {
        let Some(queue) = self.node_waiting.remove(&node) else {
            return 0;
        };
        let aborted = queue.len();
        for seq in queue {
            if let Some(request) = self.waiting.remove(&seq) {
                let _ = request.done.send(false);
            }
        }
        aborted
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            remaining_vdr_bytes: self.pools.remaining_vdr_bytes,
            remaining_at_large_bytes: self.pools.remaining_at_large_bytes,
            vdr_bytes_used: self.pools.vdr_bytes_used.clone(),
            at_large_bytes_used: self.pools.at_large_bytes_used.clone(),
            waiting: self
                .waiting
                .values()
                .map(|r| (r.node, r.bytes_needed))
                .collect(),
        }
    }

    fn publish(&self) {
        metrics::record_ledger(
            self.pools.remaining_vdr_bytes,
            self.pools.remaining_at_large_bytes,
            self.waiting.len(),
        );
    }
}

/// Point-in-time copy of the throttler ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub remaining_vdr_bytes: u64,
    pub remaining_at_large_bytes: u64,
    pub vdr_bytes_used: HashMap<ValidatorId, u64>,
    pub at_large_bytes_used: HashMap<ValidatorId, u64>,
    /// `(peer, bytes still needed)` for every waiting request, oldest first.
    pub waiting: Vec<(ValidatorId, u64)>,
}

impl LedgerSnapshot {
    pub fn vdr_used(&self, node: &ValidatorId) -> u64 {
        used(&self.vdr_bytes_used, node)
    }

    pub fn at_large_used(&self, node: &ValidatorId) -> u64 {
        used(&self.at_large_bytes_used, node)
    }

    /// Bytes still needed by `node`'s waiting requests, oldest first.
    pub fn waiting_for(&self, node: &ValidatorId) -> Vec<u64> {
        self.waiting
            .iter()
            .filter(|(n, _)| n == node)
            .map(|(_, needed)| *needed)
            .collect()
    }
}

// =============================================================================
// THROTTLER
// =============================================================================

/// Stake-weighted inbound message byte throttler.
pub struct InboundMsgByteThrottler {
    config: ByteThrottlerConfig,
    validators: Arc<ValidatorSet>,
    ledger: Mutex<Ledger>,
}

impl InboundMsgByteThrottler {
    pub fn new(
        config: ByteThrottlerConfig,
        validators: Arc<ValidatorSet>,
    ) -> Result<Self, ThrottlerConfigError> {
        config.validate()?;
        let ledger = Ledger::new(&config);
        ledger.publish();
        Ok(Self {
            config,
            validators,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn config(&self) -> &ByteThrottlerConfig {
        &self.config
    }

    /// Suspend until `msg_size` bytes are charged to `node`.
    ///
    /// Dropping the returned future before it completes gives back whatever
    /// was granted so far. If `release_all` aborts the wait, this returns
    /// without a charge and a later `release` for it is a no-op.
    pub async fn acquire(&self, msg_size: u64, node: ValidatorId) {
        let started = Instant::now();
        // Read from the set before taking the ledger lock.
        let vdr_allocation = self.vdr_allocation(&node);

        let admission = {
            let mut ledger = self.ledger.lock();
            let admission = ledger.admit(msg_size, node, vdr_allocation);
            ledger.publish();
            admission
        };
        let (seq, rx) = match admission {
            Admission::Granted => return,
            Admission::Queued { seq, rx } => (seq, rx),
        };
        debug!(
            node = %node,
            bytes = msg_size,
            "[vc-03] Waiting to acquire inbound bytes"
        );

        let mut pending = PendingAcquire {
            throttler: self,
            seq,
            node,
            msg_size,
            rx,
            settled: false,
        };
        let granted = (&mut pending.rx).await.unwrap_or(false);
        pending.settled = true;

        if granted {
            metrics::record_acquire_latency(started.elapsed().as_secs_f64());
        } else {
            debug!(node = %node, bytes = msg_size, "[vc-03] Acquire aborted by force release");
        }
    }

    /// Return `msg_size` bytes previously charged to `node`.
    pub fn release(&self, msg_size: u64, node: ValidatorId) {
        let mut ledger = self.ledger.lock();
        ledger.release(msg_size, node);
        ledger.publish();
    }

    /// Return every byte charged to `node` and abort its waiting acquires.
    /// Called when the peer disconnects.
    pub fn release_all(&self, node: ValidatorId) {
        let mut ledger = self.ledger.lock();
        let aborted = ledger.abort_node(node);
        let held = used(&ledger.pools.vdr_bytes_used, &node)
            + used(&ledger.pools.at_large_bytes_used, &node);
        if held > 0 {
            ledger.release(held, node);
        }
        ledger.publish();
        if held > 0 || aborted > 0 {
            debug!(
                node = %node,
                bytes = held,
                aborted,
                "[vc-03] Force released peer"
            );
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.lock().snapshot()
    }

    fn vdr_allocation(&self, node: &ValidatorId) -> u64 {
        let weight = self.validators.weight_of(node);
        let total = self.validators.total_weight();
        if weight == 0 || total == 0 {
            return 0;
        }
        (u128::from(self.config.vdr_alloc_size) * u128::from(weight) / u128::from(total)) as u64
    }
}

#[async_trait]
impl InboundMsgThrottler for InboundMsgByteThrottler {
    async fn acquire(&self, msg_size: u64, node: ValidatorId) {
        InboundMsgByteThrottler::acquire(self, msg_size, node).await
    }

    fn release(&self, msg_size: u64, node: ValidatorId) {
        InboundMsgByteThrottler::release(self, msg_size, node)
    }

    fn release_all(&self, node: ValidatorId) {
        InboundMsgByteThrottler::release_all(self, node)
    }
}

/// Undoes a queued acquire if its future is dropped early.
struct PendingAcquire<'a> {
    throttler: &'a InboundMsgByteThrottler,
    seq: u64,
    node: ValidatorId,
    msg_size: u64,
    rx: oneshot::Receiver<bool>,
    settled: bool,
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let throttler = self.throttler;
        let mut ledger = throttler.ledger.lock();
        match self.rx.try_recv() {
            // Fully granted but never observed.
            Ok(true) => ledger.release(self.msg_size, self.node),
            Ok(false) | Err(TryRecvError::Closed) => {}
            Err(TryRecvError::Empty) => ledger.cancel(self.seq),
        }
        ledger.publish();
    }
}
