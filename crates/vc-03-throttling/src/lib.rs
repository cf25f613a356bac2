//! # vc-03-throttling
//!
//! Inbound message byte throttler. Bounds the bytes held by messages that
//! have been read off the wire but not yet processed, and shares that budget
//! so a validator's portion follows its stake.
//!
//! ```text
//! peer ──msg──→ acquire(size, peer) ──→ [handler] ──→ release(size, peer)
//!                     │
//!            ┌────────┴────────┐
//!            │ at-large pool   │  first come, capped per peer
//!            │ validator pool  │  split by unmasked stake
//!            └─────────────────┘
//! ```
//!
//! A peer that disconnects is cleared with `release_all`.

pub mod byte_throttler;
pub mod config;
pub mod metrics;

pub use byte_throttler::{
    InboundMsgByteThrottler, InboundMsgThrottler, LedgerSnapshot, NoInboundMsgThrottler,
};
pub use config::{ByteThrottlerConfig, ThrottlerConfigError};
