//! Cross-level completion registry: which levels have reached their terminal
//! stage, and therefore which levels are unlocked.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::storage::{COMPLETED_LEVELS_KEY, Persistence, SharedStore, read_json, write_json};

/// Stored shapes of `completedLevels`. Writes always use the list form.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCompletion {
    List(Vec<u32>),
    Map(BTreeMap<String, bool>),
}

impl StoredCompletion {
    fn into_set(self) -> BTreeSet<u32> {
        match self {
            StoredCompletion::List(levels) => levels.into_iter().collect(),
            StoredCompletion::Map(levels) => levels
                .into_iter()
                .filter(|(_, done)| *done)
                .filter_map(|(id, _)| id.parse().ok())
                .collect(),
        }
    }
}

pub struct CompletionRegistry {
    backend: SharedStore,
}

impl CompletionRegistry {
    pub fn new(backend: SharedStore) -> Self {
        Self { backend }
    }

    /// Levels marked complete. Unreadable storage reads as nothing complete.
    pub fn completed(&self) -> BTreeSet<u32> {
        match read_json::<StoredCompletion>(self.backend.as_ref(), COMPLETED_LEVELS_KEY) {
            Ok(Some(stored)) => stored.into_set(),
            Ok(None) => BTreeSet::new(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read completed levels");
                BTreeSet::new()
            }
        }
    }

    pub fn is_complete(&self, level_id: u32) -> bool {
        self.completed().contains(&level_id)
    }

    /// Level 1 is always available; every later level needs its predecessor.
    pub fn is_available(&self, level_id: u32) -> bool {
        match level_id {
            0 => false,
            1 => true,
            n => self.is_complete(n - 1),
        }
    }

    pub fn mark_complete(&self, level_id: u32) -> Persistence {
        let mut levels = self.completed();
        if !levels.insert(level_id) {
            return Persistence::Saved;
        }
        let levels: Vec<u32> = levels.into_iter().collect();
        match write_json(self.backend.as_ref(), COMPLETED_LEVELS_KEY, &levels) {
            Ok(()) => {
                tracing::info!(level_id, "Level marked complete");
                Persistence::Saved
            }
            Err(err) => {
                tracing::warn!(level_id, error = %err, "Failed to record level completion");
                Persistence::Unsaved
            }
        }
    }

    /// Forget every completion.
    pub fn clear(&self) -> Persistence {
        match self.backend.remove(COMPLETED_LEVELS_KEY) {
            Ok(()) => Persistence::Saved,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to clear completed levels");
                Persistence::Unsaved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::UnavailableStore;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn registry() -> (CompletionRegistry, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (CompletionRegistry::new(backend.clone()), backend)
    }

    #[test]
    fn level_two_unlocks_after_level_one() {
        let (registry, _) = registry();
        assert!(registry.is_available(1));
        assert!(!registry.is_available(2));
        assert_eq!(registry.mark_complete(1), Persistence::Saved);
        assert!(registry.is_available(2));
        assert!(!registry.is_available(3));
    }

    #[test]
    fn level_zero_is_never_available() {
        let (registry, _) = registry();
        assert!(!registry.is_available(0));
    }

    #[test]
    fn marks_are_persisted_as_sorted_list() {
        let (registry, backend) = registry();
        let _ = registry.mark_complete(3);
        let _ = registry.mark_complete(1);
        let _ = registry.mark_complete(3);
        assert_eq!(backend.get("completedLevels").unwrap().as_deref(), Some("[1,3]"));
    }

    #[test]
    fn reads_map_form() {
        let (registry, backend) = registry();
        backend
            .set("completedLevels", r#"{"1":true,"2":false,"x":true}"#)
            .unwrap();
        assert_eq!(registry.completed(), BTreeSet::from([1]));
    }

    #[test]
    fn corrupt_or_unavailable_reads_as_empty() {
        let (registry, backend) = registry();
        backend.set("completedLevels", "nope").unwrap();
        assert!(registry.completed().is_empty());

        let registry = CompletionRegistry::new(Arc::new(UnavailableStore));
        assert!(!registry.is_complete(1));
        assert_eq!(registry.mark_complete(1), Persistence::Unsaved);
    }

    #[test]
    fn clear_forgets_completions() {
        let (registry, _) = registry();
        let _ = registry.mark_complete(1);
        let _ = registry.clear();
        assert!(!registry.is_complete(1));
    }
}
