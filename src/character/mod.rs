//! Character personas and the cached selection.
//!
//! The stage machine only reads `selectedCharacter` to personalize what the
//! hosting view shows; it never gates a transition on it.

mod client;

pub use client::{CharacterClient, SelectRequest, SelectResponse};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::storage::{Persistence, SELECTED_CHARACTER_KEY, SharedStore, read_json, write_json};

/// A selectable persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub character_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, u8>,
}

impl Character {
    fn new(id: &str, name: &str, character_type: &str, stats: &[(&str, u8)]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            character_type: character_type.to_string(),
            avatar: Some(format!("avatars/{}.png", id)),
            stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// The personas available without a server.
pub fn roster() -> Vec<Character> {
    vec![
        Character::new(
            "analyst",
            "Alex the Analyst",
            "data",
            &[("analytics", 9), ("empathy", 5), ("strategy", 6)],
        ),
        Character::new(
            "designer",
            "Dana the Designer",
            "ux",
            &[("analytics", 5), ("empathy", 9), ("strategy", 6)],
        ),
        Character::new(
            "engineer",
            "Eli the Engineer",
            "tech",
            &[("analytics", 7), ("empathy", 5), ("strategy", 7)],
        ),
        Character::new(
            "strategist",
            "Sam the Strategist",
            "business",
            &[("analytics", 6), ("empathy", 6), ("strategy", 9)],
        ),
    ]
}

pub fn find_in_roster(id: &str) -> Option<Character> {
    roster().into_iter().find(|c| c.id == id)
}

/// Read-through cache of the selected persona.
pub struct CharacterCache {
    backend: SharedStore,
}

impl CharacterCache {
    pub fn new(backend: SharedStore) -> Self {
        Self { backend }
    }

    pub fn selected(&self) -> Option<Character> {
        match read_json(self.backend.as_ref(), SELECTED_CHARACTER_KEY) {
            Ok(character) => character,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read selected character");
                None
            }
        }
    }

    pub fn store(&self, character: &Character) -> Persistence {
        match write_json(self.backend.as_ref(), SELECTED_CHARACTER_KEY, character) {
            Ok(()) => Persistence::Saved,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to cache selected character");
                Persistence::Unsaved
            }
        }
    }

    pub fn clear(&self) -> Persistence {
        match self.backend.remove(SELECTED_CHARACTER_KEY) {
            Ok(()) => Persistence::Saved,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to clear selected character");
                Persistence::Unsaved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    #[test]
    fn roster_ids_are_unique() {
        let roster = roster();
        let mut ids: Vec<_> = roster.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), roster.len());
    }

    #[test]
    fn character_json_uses_type_field() {
        let character = find_in_roster("designer").unwrap();
        let json: serde_json::Value = serde_json::to_value(&character).unwrap();
        assert_eq!(json["type"], "ux");
        assert_eq!(json["stats"]["empathy"], 9);
    }

    #[test]
    fn cache_round_trip_and_clear() {
        let backend = Arc::new(MemoryStore::new());
        let cache = CharacterCache::new(backend.clone());
        assert!(cache.selected().is_none());

        let analyst = find_in_roster("analyst").unwrap();
        assert_eq!(cache.store(&analyst), Persistence::Saved);
        assert_eq!(cache.selected(), Some(analyst));
        assert!(backend.get("selectedCharacter").unwrap().is_some());

        let _ = cache.clear();
        assert!(cache.selected().is_none());
    }

    #[test]
    fn corrupt_cache_reads_as_no_selection() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("selectedCharacter", "{").unwrap();
        assert!(CharacterCache::new(backend).selected().is_none());
    }
}
