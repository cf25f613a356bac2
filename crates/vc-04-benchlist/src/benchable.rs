//! Port notified when validators enter or leave the bench.

use parking_lot::Mutex;
use shared_types::{ChainId, ValidatorId};

/// Receives bench transitions for a chain.
///
/// Called without any benchlist lock held, so implementations may call back
/// into the benchlist.
pub trait Benchable: Send + Sync {
    fn benched(&self, chain_id: ChainId, validator: ValidatorId);

    fn unbenched(&self, chain_id: ChainId, validator: ValidatorId);
}

/// A bench transition seen by [`RecordingBenchable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchEvent {
    Benched(ChainId, ValidatorId),
    Unbenched(ChainId, ValidatorId),
}

/// Benchable that remembers every notification, in order.
#[derive(Debug, Default)]
pub struct RecordingBenchable {
    events: Mutex<Vec<BenchEvent>>,
}

impl RecordingBenchable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BenchEvent> {
        self.events.lock().clone()
    }

    pub fn benched_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, BenchEvent::Benched(..)))
            .count()
    }

    pub fn unbenched_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, BenchEvent::Unbenched(..)))
            .count()
    }
}

impl Benchable for RecordingBenchable {
    fn benched(&self, chain_id: ChainId, validator: ValidatorId) {
        self.events
            .lock()
            .push(BenchEvent::Benched(chain_id, validator));
    }

    fn unbenched(&self, chain_id: ChainId, validator: ValidatorId) {
        self.events
            .lock()
            .push(BenchEvent::Unbenched(chain_id, validator));
    }
}
