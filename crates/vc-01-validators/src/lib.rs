//! # vc-01-validators
//!
//! The authoritative weighted validator set and the machinery that keeps it
//! in step with an external membership source.
//!
//! ## Overview
//!
//! - **Weighted Set**: `ValidatorId -> weight`, overflow-checked totals, a
//!   mask overlay and stake-weighted sampling.
//! - **Source**: an outbound port returning weights at a reference point.
//! - **Retrieval**: `SourceRetriever` and an LRU `CachingRetriever`.
//! - **Manager**: one live set with a stable identity, refreshed on demand
//!   and degraded to the last known good membership on source errors.
//!
//! ## Architecture
//!
//! ```text
//!  ValidatorSource ──load──→ SourceRetriever ──→ CachingRetriever (LRU)
//!                                                      │
//!                                                      ↓
//!                      ValidatorManager ──→ RetrievingUpdater ──set()──→ live ValidatorSet
//!                                                                        │   │   │
//!                                              Poll sampling ←───────────┘   │   └──→ Byte throttler
//!                                                                  Benchlist ┘ (mask/reveal)
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::StaticValidatorSource;
pub use domain::{
    parse_node_id, DefaultValidatorsConfig, MaskOwner, NetworkId, SampleSeed, ValidatorSet,
    VALIDATORS_FILE_ENV,
};
pub use error::{SourceError, ValidatorError, ValidatorResult};
pub use ports::ValidatorSource;
pub use service::{
    CachingRetriever, ManagerConfig, Retriever, RetrievingUpdater, SourceRetriever, Updater,
    ValidatorManager, DEFAULT_CACHE_CAPACITY,
};
