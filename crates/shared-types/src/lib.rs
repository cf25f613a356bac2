//! # Shared Types Crate
//!
//! Identifiers and value types shared by every coordination subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `ValidatorId`, `BlockId` and `ChainId` are
//!   defined once here and used by the validator set, the poll engine, the
//!   throttler and the benchlist alike.
//! - **Opaque and Ordered**: every identifier is a fixed-width byte array with
//!   a total order, so collections keyed by them iterate deterministically.
//! - **Textual Form**: validator ids render as `NodeID-<cb58>`; block and
//!   chain ids render as bare hex.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
