//! Adapters for the validators subsystem

pub mod static_source;

pub use static_source::StaticValidatorSource;
