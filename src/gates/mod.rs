//! Forward-navigation gates.
//!
//! Each stage carries a `GateRule` from configuration. The evaluator checks the
//! rule against transient `InteractionState` owned by the hosting view; the
//! result is a plain yes/no plus guidance text, never an error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::quiz::QuizOutcome;
use crate::stage::Stage;

/// Per-stage completion rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// Always passable
    #[default]
    None,
    /// Every scripted line must have been revealed
    Dialogue { total_messages: usize },
    /// Free text must reach `min_chars` (trimmed, counted in characters)
    Reflection { min_chars: usize },
    /// Enough correct selections AND a long enough conclusion
    Insights {
        correct: BTreeSet<String>,
        min_correct: usize,
        min_chars: usize,
    },
    /// The quiz component must have reported completion
    Quiz,
}

/// Component-local interaction flags for the current stage. Never persisted
/// as-is; the runner rebuilds it on every stage change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    /// Index of the last revealed dialogue line (the first line shows on entry)
    pub dialogue_index: usize,
    /// Reflection text, or the conclusion of an insights stage
    pub text: String,
    pub selected_insights: BTreeSet<String>,
    pub quiz: Option<QuizOutcome>,
}

impl InteractionState {
    /// Reveal the next dialogue line. Lines are revealed strictly one at a
    /// time, whether by auto-play or by an explicit skip.
    ///
    /// Returns `false` once the last line is already showing.
    pub fn reveal_next(&mut self, total_messages: usize) -> bool {
        if self.dialogue_index + 1 < total_messages {
            self.dialogue_index += 1;
            true
        } else {
            false
        }
    }

    /// Toggle an insight selection; returns whether it is now selected.
    pub fn toggle_insight(&mut self, id: &str) -> bool {
        if self.selected_insights.remove(id) {
            false
        } else {
            self.selected_insights.insert(id.to_string());
            true
        }
    }

    /// The quiz component's `onComplete(score, answers)` callback.
    pub fn on_quiz_complete(&mut self, outcome: QuizOutcome) {
        self.quiz = Some(outcome);
    }
}

/// Why a gate is closed. `Display` renders user-facing guidance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsatisfied {
    DialogueUnfinished { remaining: usize },
    TextTooShort { required: usize, current: usize },
    NotEnoughInsights { required: usize },
    QuizIncomplete,
}

impl fmt::Display for Unsatisfied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsatisfied::DialogueUnfinished { remaining: 1 } => {
                write!(f, "View the last dialogue line to continue")
            }
            Unsatisfied::DialogueUnfinished { remaining } => {
                write!(f, "View the remaining {} dialogue lines to continue", remaining)
            }
            Unsatisfied::TextTooShort { required, current } => write!(
                f,
                "Write at least {} characters ({} so far)",
                required, current
            ),
            Unsatisfied::NotEnoughInsights { required } => write!(
                f,
                "Select at least {} insights that are supported by the data",
                required
            ),
            Unsatisfied::QuizIncomplete => write!(f, "Answer every quiz question to finish"),
        }
    }
}

/// Stateless predicate over (stage, interaction state).
pub struct GateEvaluator;

impl GateEvaluator {
    /// Whether forward navigation from `stage` is currently allowed.
    pub fn can_advance(stage: &Stage, state: &InteractionState) -> bool {
        Self::evaluate(&stage.gate, state).is_ok()
    }

    /// Guidance for the hosting view when the gate is closed.
    pub fn guidance(stage: &Stage, state: &InteractionState) -> Option<String> {
        Self::evaluate(&stage.gate, state)
            .err()
            .map(|u| u.to_string())
    }

    pub fn evaluate(rule: &GateRule, state: &InteractionState) -> Result<(), Unsatisfied> {
        match rule {
            GateRule::None => Ok(()),
            GateRule::Dialogue { total_messages } => {
                let last = total_messages.saturating_sub(1);
                if state.dialogue_index >= last {
                    Ok(())
                } else {
                    Err(Unsatisfied::DialogueUnfinished {
                        remaining: last - state.dialogue_index,
                    })
                }
            }
            GateRule::Reflection { min_chars } => check_text(&state.text, *min_chars),
            GateRule::Insights {
                correct,
                min_correct,
                min_chars,
            } => {
                let matching = state
                    .selected_insights
                    .iter()
                    .filter(|id| correct.contains(*id))
                    .count();
                if matching < *min_correct {
                    return Err(Unsatisfied::NotEnoughInsights {
                        required: *min_correct,
                    });
                }
                check_text(&state.text, *min_chars)
            }
            GateRule::Quiz => match state.quiz {
                Some(_) => Ok(()),
                None => Err(Unsatisfied::QuizIncomplete),
            },
        }
    }
}

fn check_text(text: &str, min_chars: usize) -> Result<(), Unsatisfied> {
    let current = text.trim().chars().count();
    if current >= min_chars {
        Ok(())
    } else {
        Err(Unsatisfied::TextTooShort {
            required: min_chars,
            current,
        })
    }
}
