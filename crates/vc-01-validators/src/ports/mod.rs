//! Ports module for the validators subsystem

pub mod outbound;

pub use outbound::ValidatorSource;
