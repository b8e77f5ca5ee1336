//! Per-level progress records and their best-effort persistence.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::ProgressionError;
use crate::sequencer::StageSequencer;
use crate::stage::StageId;
use crate::storage::{Persistence, SharedStore, level_progress_key, read_json, write_json};

const ANSWERS_KEY: &str = "answers";
const UPDATED_AT_KEY: &str = "updatedAt";

/// Persisted progress for one level.
///
/// On disk: `{ "stage": ..., "notes": [...], ...aux }`. The level id is the
/// storage key and is not repeated inside the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(skip)]
    pub level_id: u32,
    pub stage: StageId,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(flatten)]
    pub aux: Map<String, Value>,
}

impl ProgressRecord {
    /// The unvisited state of a level.
    pub fn new(level_id: u32, stage: StageId) -> Self {
        Self {
            level_id,
            stage,
            notes: Vec::new(),
            aux: Map::new(),
        }
    }

    /// Saved answer data for a stage, if any.
    pub fn answer(&self, stage: &StageId) -> Option<&Value> {
        self.aux
            .get(ANSWERS_KEY)
            .and_then(Value::as_object)
            .and_then(|answers| answers.get(stage.as_str()))
    }

    pub fn set_answer(&mut self, stage: &StageId, value: Value) {
        let answers = self
            .aux
            .entry(ANSWERS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !answers.is_object() {
            *answers = Value::Object(Map::new());
        }
        if let Value::Object(map) = answers {
            map.insert(stage.as_str().to_string(), value);
        }
    }

    /// Stamp the record with the current time.
    pub fn touch(&mut self) {
        self.aux.insert(
            UPDATED_AT_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.aux.get(UPDATED_AT_KEY).and_then(Value::as_str)
    }
}

/// A note as supplied by the hosting view.
///
/// Older views pass bare strings; newer ones pass structured entries. Both
/// are normalized to the stored string form before persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteInput {
    Text(String),
    Entry(NoteEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub text: String,
    pub stage: Option<StageId>,
}

impl NoteInput {
    /// The stored form, or `None` for a blank note.
    pub fn normalize(&self) -> Option<String> {
        let (text, stage) = match self {
            NoteInput::Text(text) => (text.as_str(), None),
            NoteInput::Entry(entry) => (entry.text.as_str(), entry.stage.as_ref()),
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(match stage {
            Some(stage) => format!("[{}] {}", stage, text),
            None => text.to_string(),
        })
    }
}

impl From<&str> for NoteInput {
    fn from(text: &str) -> Self {
        NoteInput::Text(text.to_string())
    }
}

impl From<String> for NoteInput {
    fn from(text: String) -> Self {
        NoteInput::Text(text)
    }
}

impl From<NoteEntry> for NoteInput {
    fn from(entry: NoteEntry) -> Self {
        NoteInput::Entry(entry)
    }
}

/// Loads and saves `ProgressRecord`s. Storage failures never propagate: reads
/// fall back to the default record and writes report `Persistence::Unsaved`.
pub struct ProgressStore {
    backend: SharedStore,
    sequencer: StageSequencer,
    degraded: AtomicBool,
}

impl ProgressStore {
    pub fn new(backend: SharedStore, sequencer: StageSequencer) -> Self {
        Self {
            backend,
            sequencer,
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether any read or write has failed since this store was created.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn mark_degraded(&self) {
        self.degraded.store(true, Ordering::Relaxed);
    }

    /// The default record for a level; not persisted.
    pub fn default_record(&self, level_id: u32) -> Result<ProgressRecord, ProgressionError> {
        let first = self.sequencer.first(level_id)?.id.clone();
        Ok(ProgressRecord::new(level_id, first))
    }

    /// Read the saved record, or synthesize the default without saving it.
    pub fn load(&self, level_id: u32) -> Result<ProgressRecord, ProgressionError> {
        let key = level_progress_key(level_id);
        match read_json::<ProgressRecord>(self.backend.as_ref(), &key) {
            Ok(Some(mut record)) => {
                record.level_id = level_id;
                Ok(record)
            }
            Ok(None) => self.default_record(level_id),
            Err(err) => {
                tracing::warn!(level_id, error = %err, "Failed to load progress; using defaults");
                self.mark_degraded();
                self.default_record(level_id)
            }
        }
    }

    /// Overwrite the saved record in full.
    pub fn save(&self, level_id: u32, record: &ProgressRecord) -> Persistence {
        let key = level_progress_key(level_id);
        match write_json(self.backend.as_ref(), &key, record) {
            Ok(()) => {
                tracing::debug!(level_id, stage = %record.stage, "Progress saved");
                Persistence::Saved
            }
            Err(err) => {
                tracing::warn!(level_id, error = %err, "Failed to save progress");
                self.mark_degraded();
                Persistence::Unsaved
            }
        }
    }

    /// Delete the saved record, returning the level to its unvisited state.
    pub fn reset(&self, level_id: u32) -> Persistence {
        match self.backend.remove(&level_progress_key(level_id)) {
            Ok(()) => {
                tracing::debug!(level_id, "Progress reset");
                Persistence::Saved
            }
            Err(err) => {
                tracing::warn!(level_id, error = %err, "Failed to reset progress");
                self.mark_degraded();
                Persistence::Unsaved
            }
        }
    }

    /// Read-modify-write: append a note and persist. Blank notes leave the
    /// record untouched and report `None` in place of a save outcome.
    pub fn append_note(
        &self,
        level_id: u32,
        note: impl Into<NoteInput>,
    ) -> Result<(ProgressRecord, Option<Persistence>), ProgressionError> {
        let mut record = self.load(level_id)?;
        let Some(text) = note.into().normalize() else {
            return Ok((record, None));
        };
        record.notes.push(text);
        record.touch();
        let persistence = self.save(level_id, &record);
        Ok((record, Some(persistence)))
    }
}
