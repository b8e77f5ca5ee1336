//! Client-local key-value persistence.
//!
//! Keys follow the course layout:
//!
//! ```text
//! level{N}_progress   # { "stage": ..., "notes": [...], ...aux }
//! completedLevels     # [1, 2]
//! selectedCharacter   # { "id": ..., "name": ..., ... }
//! ```
//!
//! Backends are shared between the progress store, the completion registry
//! and the character cache through `SharedStore`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::errors::StorageError;

pub const COMPLETED_LEVELS_KEY: &str = "completedLevels";
pub const SELECTED_CHARACTER_KEY: &str = "selectedCharacter";

/// Key under which a level's progress record lives.
pub fn level_progress_key(level_id: u32) -> String {
    format!("level{}_progress", level_id)
}

/// String-valued key-value storage with whole-value overwrite semantics.
///
/// There is no cross-writer coordination: the last `set` wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Outcome of a best-effort write.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Saved,
    /// The write failed; the in-memory state is still authoritative for this session
    Unsaved,
}

impl Persistence {
    pub fn is_saved(self) -> bool {
        matches!(self, Persistence::Saved)
    }
}

/// Read and decode a JSON value.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encode and write a JSON value.
pub fn write_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}
