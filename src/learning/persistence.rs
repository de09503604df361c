//! Key-value persistence seam for the learned pattern store.
//!
//! The store itself is storage-agnostic; hosts plug in whatever backend
//! they have (app-data file, SQLite row, platform keystore) through the
//! [`KeyValueStore`] trait. [`MemoryKeyValueStore`] backs the tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::error::StorageError;
use crate::learning::store::LearningStore;
use crate::models::LearnedMedicationPattern;

/// Key the pattern store is persisted under.
pub const PATTERN_STORE_KEY: &str = "learned-patterns-storage";

/// Minimal async key-value backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Deserialize)]
struct StoredPayload {
    patterns: Vec<LearnedMedicationPattern>,
    #[serde(default)]
    metadata: StoredMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct StoredMetadata {
    #[serde(default)]
    total_validations: u64,
}

/// Load the pattern store from `backend`.
///
/// A missing key yields a fresh store. A present but unreadable payload
/// is logged and also yields a fresh store rather than failing startup;
/// the corrupt value stays in place until the next persist overwrites it.
pub async fn load_patterns(backend: &dyn KeyValueStore) -> Result<LearningStore, StorageError> {
    let Some(raw) = backend.get(PATTERN_STORE_KEY).await? else {
        return Ok(LearningStore::new());
    };

    match serde_json::from_str::<StoredPayload>(&raw) {
        Ok(payload) => {
            tracing::debug!(count = payload.patterns.len(), "loaded learned patterns");
            Ok(LearningStore::from_parts(
                payload.patterns,
                payload.metadata.total_validations,
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "stored patterns unreadable, starting fresh");
            Ok(LearningStore::new())
        }
    }
}

/// Persist the full pattern store to `backend` under [`PATTERN_STORE_KEY`].
pub async fn persist_patterns(
    backend: &dyn KeyValueStore,
    store: &LearningStore,
) -> Result<(), StorageError> {
    let json = store
        .export_json(Utc::now())
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    backend.set(PATTERN_STORE_KEY, json).await
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("store mutex poisoned".into()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
