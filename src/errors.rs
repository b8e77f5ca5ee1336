//! Typed error hierarchy for pmquest.
//!
//! Five enums cover the course engine:
//! - `ProgressionError`: sequencer lookups and level availability
//! - `SequenceError`: catalog and stage-sequence validation
//! - `StorageError`: key-value persistence failures (caught, never surfaced)
//! - `QuizError`: invalid quiz answers
//! - `ApiError`: character-selection endpoint failures
//!
//! Gate failures are not errors; see `crate::gates::Unsatisfied`.

use thiserror::Error;

use crate::stage::StageId;

/// Errors from navigating a level's stage sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("Level {level_id} is not defined in the course catalog")]
    UnknownLevel { level_id: u32 },

    #[error("Stage '{stage}' is not part of level {level_id}")]
    InvalidStage { level_id: u32, stage: StageId },

    #[error("Level {level_id} has no display name for stage '{stage}'")]
    UnknownStage { level_id: u32, stage: StageId },

    #[error("Level {level_id} is locked until level {requires} is complete")]
    LevelLocked { level_id: u32, requires: u32 },
}

/// Errors from building a stage sequence or a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Stage sequence is empty")]
    Empty,

    #[error("Stage '{0}' appears more than once")]
    Duplicate(StageId),

    #[error("Stage sequence has no terminal stage")]
    MissingTerminal,

    #[error("Stage sequence has more than one terminal stage ('{first}' and '{second}')")]
    MultipleTerminals { first: StageId, second: StageId },

    #[error("Terminal stage '{0}' must be the last stage")]
    TerminalNotLast(StageId),

    #[error("Stage '{stage}' has a blank title")]
    BlankTitle { stage: StageId },

    #[error("Stage '{stage}' scripts {lines} dialogue lines but its gate expects {expected}")]
    DialogueMismatch {
        stage: StageId,
        lines: usize,
        expected: usize,
    },

    #[error("Level ids must be contiguous from 1 (expected {expected}, found {found})")]
    NonContiguousLevel { expected: u32, found: u32 },

    #[error("Level {level_id}: {source}")]
    InLevel {
        level_id: u32,
        #[source]
        source: Box<SequenceError>,
    },
}

/// Errors from the key-value persistence layer.
///
/// These are recovered inside the stores; callers only ever observe a
/// `Persistence::Unsaved` outcome or a defaulted record.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for key '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage quota exceeded while writing key '{key}'")]
    QuotaExceeded { key: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a single quiz interaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("Question '{0}' is not part of this quiz")]
    UnknownQuestion(String),

    #[error("Question '{question}' has no option {choice}")]
    ChoiceOutOfRange { question: String, choice: usize },
}

/// Errors from the character-selection endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Character request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Character endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("Character selection rejected: {0}")]
    Rejected(String),

    #[error("Character endpoint reported success without a character")]
    MissingCharacter,
}
