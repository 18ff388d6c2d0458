//! Per-player violation counters and their durable storage seam

pub mod persistence;
pub mod store;

pub use persistence::{JsonFileStore, MemoryStore, PersistenceStore};
pub use store::{CheckCounter, FlagStore, PlayerViolationRecord};
