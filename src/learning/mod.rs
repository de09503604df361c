//! Pattern learning and matching engine.
//!
//! [`matcher`] holds the pure text machinery: normalization, structural
//! signatures, Levenshtein similarity, and the adaptive confidence /
//! threshold model. [`store`] owns the learned pattern set and applies
//! user validations to it. [`persistence`] is the caller-owned key-value
//! seam the store round-trips through.

pub mod matcher;
pub mod persistence;
pub mod store;

pub use persistence::{load_patterns, persist_patterns, KeyValueStore, MemoryKeyValueStore};
pub use store::LearningStore;
