//! Stage definitions: the screens a level is made of.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gates::GateRule;
use crate::quiz::Question;

/// Identifier of a stage, unique within its level (e.g. "theory_metrics").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The closed set of screen types a stage can be.
///
/// Every variant has a label, checked exhaustively by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Intro,
    Dialogue,
    Theory,
    Practice,
    Reflection,
    Insights,
    Quiz,
    /// The absorbing end of a level.
    Complete,
}

impl StageKind {
    pub fn label(self) -> &'static str {
        match self {
            StageKind::Intro => "Intro",
            StageKind::Dialogue => "Dialogue",
            StageKind::Theory => "Theory",
            StageKind::Practice => "Practice",
            StageKind::Reflection => "Reflection",
            StageKind::Insights => "Insights",
            StageKind::Quiz => "Quiz",
            StageKind::Complete => "Complete",
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, StageKind::Complete)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One scripted line in a dialogue stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

/// One selectable option in an insights stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightOption {
    pub id: String,
    pub text: String,
}

/// Content the hosting view renders for a stage. Not consulted by the engine
/// except for dialogue line counts during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<DialogueLine>,
    /// Prompt shown above a free-text box (reflection, insights conclusion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<InsightOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
}

/// A single stage in a level's curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub kind: StageKind,
    /// Human-readable label for navigation
    pub title: String,
    #[serde(default)]
    pub gate: GateRule,
    #[serde(default)]
    pub content: StageContent,
}

impl Stage {
    /// Create a stage with no gate and no content.
    pub fn new(id: &str, kind: StageKind, title: &str) -> Self {
        Self {
            id: StageId::new(id),
            kind,
            title: title.to_string(),
            gate: GateRule::None,
            content: StageContent::default(),
        }
    }

    /// A theory panel; always passable.
    pub fn theory(id: &str, title: &str, body: &str) -> Self {
        let mut stage = Self::new(id, StageKind::Theory, title);
        stage.content.body = Some(body.to_string());
        stage
    }

    /// A dialogue stage whose gate requires every line to be revealed.
    pub fn dialogue(id: &str, title: &str, lines: Vec<DialogueLine>) -> Self {
        let mut stage = Self::new(id, StageKind::Dialogue, title);
        stage.gate = GateRule::Dialogue {
            total_messages: lines.len(),
        };
        stage.content.lines = lines;
        stage
    }

    /// A free-text reflection stage.
    pub fn reflection(id: &str, title: &str, prompt: &str, min_chars: usize) -> Self {
        let mut stage = Self::new(id, StageKind::Reflection, title);
        stage.gate = GateRule::Reflection { min_chars };
        stage.content.prompt = Some(prompt.to_string());
        stage
    }

    /// A quiz stage; passable once the quiz reports completion.
    pub fn quiz(id: &str, title: &str, questions: Vec<Question>) -> Self {
        let mut stage = Self::new(id, StageKind::Quiz, title);
        stage.gate = GateRule::Quiz;
        stage.content.questions = questions;
        stage
    }

    /// The terminal stage of a level.
    pub fn complete(id: &str, title: &str) -> Self {
        Self::new(id, StageKind::Complete, title)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Number of dialogue messages the stage's gate counts. Falls back to the
    /// scripted lines when the gate is not a dialogue gate.
    pub fn dialogue_len(&self) -> usize {
        match &self.gate {
            GateRule::Dialogue { total_messages } => *total_messages,
            _ => self.content.lines.len(),
        }
    }
}

/// Shorthand for building dialogue scripts.
pub fn line(speaker: &str, text: &str) -> DialogueLine {
    DialogueLine {
        speaker: speaker.to_string(),
        text: text.to_string(),
    }
}
