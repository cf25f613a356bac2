//! # Node Runtime Library
//!
//! Configuration loading, tracing setup and the [`Coordinator`] that wires
//! the validator manager, poll engine, inbound throttler and benchlist
//! together. The `node-runtime` binary is a thin shell around these.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file, then `VC_*` environment overrides)
//! 2. Initialise tracing
//! 3. Build the default validator set and the manager
//! 4. Build the poll factory, throttler and benchlist on the manager's live set
//! 5. Serve until Ctrl+C

pub mod config;
pub mod coordinator;
pub mod telemetry;

pub use config::{BenchlistSettings, ConfigError, LoggingConfig, NodeConfig};
pub use coordinator::{Coordinator, CoordinatorError, TracingBenchable};
