//! Application services: retrieval, live-set updates and the manager.

pub mod manager;
pub mod retriever;
pub mod updater;

pub use manager::{ManagerConfig, ValidatorManager};
pub use retriever::{CachingRetriever, Retriever, SourceRetriever, DEFAULT_CACHE_CAPACITY};
pub use updater::{RetrievingUpdater, Updater};
