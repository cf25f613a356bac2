//! # vc-02-poll
//!
//! Quorum poll engine: aggregates one round of votes from sampled validators
//! and decides as early as possible whether an outcome reached `alpha`.
//!
//! ## Lifecycle
//!
//! ```text
//! [CREATED] ──vote/drop──→ [COLLECTING] ──alpha reached / exhausted / unreachable──→ [FINISHED]
//! ```
//!
//! `Vote` and `Drop` never block. A `PollSet` tracks polls by request id and
//! returns results in the order the polls were created.

pub mod bag;
pub mod config;
pub mod early_term;
pub mod error;
pub mod metrics;
pub mod set;

pub use bag::{OutcomeVotes, Tally, VoterBag};
pub use config::PollConfig;
pub use early_term::{Poll, PollFactory};
pub use error::{PollError, PollResult};
pub use set::PollSet;
