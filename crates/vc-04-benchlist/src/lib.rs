//! # vc-04-benchlist
//!
//! Temporarily excludes validators that keep failing requests.
//!
//! ```text
//! register_failure ──→ [STREAK] ──threshold + min duration──→ [BENCHED] ──timer──→ [RELEASED]
//!        ↑                │                                     (weight masked)    (weight revealed)
//!        └──response──────┘ (streak cleared)
//! ```
//!
//! Bench transitions are reported through the [`Benchable`] port.

pub mod benchable;
pub mod benchlist;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;

pub use benchable::{BenchEvent, Benchable, RecordingBenchable};
pub use benchlist::{Benchlist, FailureStreak};
pub use config::BenchlistConfig;
pub use error::{BenchlistError, BenchlistResult};
pub use queue::{BenchEntry, BenchQueue};
