//! Level catalog: the data-driven stage sequences of every level.
//!
//! This module provides:
//! - `StageSequence`, a validated ordered list of stages
//! - `Level` and `Catalog` with contiguous 1-based level ids
//! - `LevelsFile` for loading a catalog override from JSON
//! - `builtin_catalog` as the default course

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::errors::SequenceError;
use crate::gates::GateRule;
use crate::quiz::Question;
use crate::stage::{InsightOption, Stage, StageId, StageKind, line};

/// An ordered, duplicate-free list of stages ending in exactly one terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stage>", into = "Vec<Stage>")]
pub struct StageSequence {
    stages: Vec<Stage>,
}

impl StageSequence {
    pub fn new(stages: Vec<Stage>) -> Result<Self, SequenceError> {
        let Some(last) = stages.last() else {
            return Err(SequenceError::Empty);
        };

        let mut seen = HashSet::new();
        let mut terminal: Option<&StageId> = None;
        for stage in &stages {
            if !seen.insert(&stage.id) {
                return Err(SequenceError::Duplicate(stage.id.clone()));
            }
            if stage.title.trim().is_empty() {
                return Err(SequenceError::BlankTitle {
                    stage: stage.id.clone(),
                });
            }
            if let GateRule::Dialogue { total_messages } = &stage.gate
                && !stage.content.lines.is_empty()
                && stage.content.lines.len() != *total_messages
            {
                return Err(SequenceError::DialogueMismatch {
                    stage: stage.id.clone(),
                    lines: stage.content.lines.len(),
                    expected: *total_messages,
                });
            }
            if stage.is_terminal() {
                if let Some(first) = terminal {
                    return Err(SequenceError::MultipleTerminals {
                        first: first.clone(),
                        second: stage.id.clone(),
                    });
                }
                terminal = Some(&stage.id);
            }
        }

        match terminal {
            None => return Err(SequenceError::MissingTerminal),
            Some(id) if *id != last.id => {
                return Err(SequenceError::TerminalNotLast(id.clone()));
            }
            Some(_) => {}
        }

        Ok(Self { stages })
    }

    pub fn first(&self) -> &Stage {
        &self.stages[0]
    }

    pub fn terminal(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    pub fn position(&self, id: &StageId) -> Option<usize> {
        self.stages.iter().position(|s| &s.id == id)
    }

    pub fn get(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Never true for a constructed sequence.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl TryFrom<Vec<Stage>> for StageSequence {
    type Error = SequenceError;

    fn try_from(stages: Vec<Stage>) -> Result<Self, Self::Error> {
        Self::new(stages)
    }
}

impl From<StageSequence> for Vec<Stage> {
    fn from(sequence: StageSequence) -> Self {
        sequence.stages
    }
}

/// A top-level unit of the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub stages: StageSequence,
}

/// The full set of levels, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    levels: Vec<Level>,
}

impl Catalog {
    pub fn new(mut levels: Vec<Level>) -> Result<Self, SequenceError> {
        if levels.is_empty() {
            return Err(SequenceError::Empty);
        }
        levels.sort_by_key(|l| l.id);
        for (index, level) in levels.iter().enumerate() {
            let expected = index as u32 + 1;
            if level.id != expected {
                return Err(SequenceError::NonContiguousLevel {
                    expected,
                    found: level.id,
                });
            }
        }
        Ok(Self { levels })
    }

    pub fn level(&self, id: u32) -> Option<&Level> {
        id.checked_sub(1)
            .and_then(|index| self.levels.get(index as usize))
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// On-disk catalog override (`levels.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsFile {
    pub levels: Vec<Level>,
}

impl LevelsFile {
    /// Load levels from a JSON file. Stage sequences are validated while
    /// parsing; level ordering is validated by `into_catalog`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read levels file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse levels JSON: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize levels to JSON")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write levels file: {}", path.display()))
    }

    pub fn into_catalog(self) -> Result<Catalog, SequenceError> {
        Catalog::new(self.levels)
    }
}

impl From<&Catalog> for LevelsFile {
    fn from(catalog: &Catalog) -> Self {
        Self {
            levels: catalog.levels.clone(),
        }
    }
}

/// Thresholds applied to the gated stages of the built-in course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDefaults {
    pub reflection_min_chars: usize,
    pub insights_min_chars: usize,
    pub insights_min_correct: usize,
}

impl Default for GateDefaults {
    fn default() -> Self {
        Self {
            reflection_min_chars: 100,
            insights_min_chars: 100,
            insights_min_correct: 4,
        }
    }
}

fn insights_stage(
    id: &str,
    title: &str,
    prompt: &str,
    options: &[(&str, &str, bool)],
    gates: &GateDefaults,
) -> Stage {
    let mut stage = Stage::new(id, StageKind::Insights, title);
    let correct: BTreeSet<String> = options
        .iter()
        .filter(|(_, _, ok)| *ok)
        .map(|(id, _, _)| id.to_string())
        .collect();
    stage.gate = GateRule::Insights {
        min_correct: gates.insights_min_correct.min(correct.len()),
        correct,
        min_chars: gates.insights_min_chars,
    };
    stage.content.prompt = Some(prompt.to_string());
    stage.content.insights = options
        .iter()
        .map(|(id, text, _)| InsightOption {
            id: id.to_string(),
            text: text.to_string(),
        })
        .collect();
    stage
}

fn practice_stage(id: &str, title: &str, body: &str) -> Stage {
    let mut stage = Stage::new(id, StageKind::Practice, title);
    stage.content.body = Some(body.to_string());
    stage
}

fn level(id: u32, title: &str, summary: &str, stages: Vec<Stage>) -> Result<Level, SequenceError> {
    let stages = StageSequence::new(stages).map_err(|source| SequenceError::InLevel {
        level_id: id,
        source: Box::new(source),
    })?;
    Ok(Level {
        id,
        title: title.to_string(),
        summary: summary.to_string(),
        stages,
    })
}

/// The built-in three-level course.
pub fn builtin_catalog(gates: &GateDefaults) -> Result<Catalog, SequenceError> {
    let level_one = level(
        1,
        "Metrics that matter",
        "Read a product dashboard and decide what to fix first.",
        vec![
            Stage::dialogue(
                "intro",
                "First day on the team",
                vec![
                    line("Mentor", "Welcome aboard. Our onboarding funnel is leaking users."),
                    line("Mentor", "Leadership wants a plan by Friday."),
                    line("You", "Where do I start?"),
                    line("Mentor", "With the numbers. Opinions come later."),
                    line("Mentor", "Let's go over the metrics we track."),
                ],
            ),
            Stage::theory(
                "theory_metrics",
                "Theory: product metrics",
                "Acquisition, activation, retention, revenue and referral describe the user lifecycle.",
            ),
            insights_stage(
                "practice_ux",
                "Practice: UX analysis",
                "Which conclusions does the funnel data support?",
                &[
                    ("signup_drop", "Most users drop at the signup form", true),
                    ("mobile_gap", "Mobile converts worse than desktop", true),
                    ("tutorial_skip", "Users who skip the tutorial churn sooner", true),
                    ("pricing_ok", "Pricing is not the main drop-off cause", true),
                    ("d7_low", "Day-7 retention is below benchmark", true),
                    ("ads_bad", "The ad campaign brought only bots", false),
                    ("color", "The button color causes churn", false),
                ],
                gates,
            ),
            Stage::reflection(
                "reflection",
                "Reflection",
                "Which metric would you move first, and why?",
                gates.reflection_min_chars,
            ),
            Stage::quiz(
                "quiz",
                "Quiz: metrics",
                vec![
                    Question::new(
                        "q1",
                        "Which metric describes users coming back?",
                        &["Acquisition", "Retention", "Revenue"],
                        1,
                    ),
                    Question::new(
                        "q2",
                        "An activation metric measures...",
                        &["First value delivered", "Ad impressions", "Server uptime"],
                        0,
                    ),
                    Question::new(
                        "q3",
                        "A north-star metric should be...",
                        &["Easy to game", "Tied to user value", "Reported yearly"],
                        1,
                    ),
                ],
            ),
            Stage::complete("complete", "Level complete"),
        ],
    )?;

    let level_two = level(
        2,
        "Discovery and research",
        "Turn user interviews into problem statements.",
        vec![
            Stage::dialogue(
                "intro",
                "A stakeholder request",
                vec![
                    line("Sales lead", "Customers keep asking for an export button."),
                    line("Mentor", "Is export the problem, or a proposed solution?"),
                    line("Mentor", "Talk to five customers before we decide."),
                ],
            ),
            Stage::theory(
                "theory_research",
                "Theory: discovery interviews",
                "Ask about past behavior, not hypothetical futures. Listen for the job to be done.",
            ),
            practice_stage(
                "practice_interviews",
                "Practice: interview notes",
                "Sort the interview quotes into problems, workarounds and requests.",
            ),
            Stage::reflection(
                "reflection",
                "Reflection",
                "Write the problem statement you would take to the team.",
                gates.reflection_min_chars,
            ),
            Stage::quiz(
                "quiz",
                "Quiz: discovery",
                vec![
                    Question::new(
                        "q1",
                        "A good interview question is...",
                        &["Would you use feature X?", "Tell me about the last time you..."],
                        1,
                    ),
                    Question::new(
                        "q2",
                        "A feature request is best treated as...",
                        &["A requirement", "Evidence of an underlying problem"],
                        1,
                    ),
                ],
            ),
            Stage::complete("complete", "Level complete"),
        ],
    )?;

    let level_three = level(
        3,
        "Prioritization",
        "Build a roadmap the team can defend.",
        vec![
            Stage::dialogue(
                "intro",
                "Too many ideas",
                vec![
                    line("Mentor", "We have forty ideas and capacity for four."),
                    line("Mentor", "Let's score them before anyone argues."),
                ],
            ),
            Stage::theory(
                "theory_prioritization",
                "Theory: RICE scoring",
                "Reach times impact times confidence, divided by effort.",
            ),
            insights_stage(
                "practice_roadmap",
                "Practice: roadmap review",
                "Which items belong in the next quarter?",
                &[
                    ("fix_signup", "Simplify the signup form", true),
                    ("mobile_onboarding", "Rebuild mobile onboarding", true),
                    ("export", "Add CSV export", true),
                    ("retention_email", "Day-3 re-engagement email", true),
                    ("rebrand", "Full visual rebrand", false),
                    ("blockchain", "Blockchain loyalty points", false),
                ],
                gates,
            ),
            Stage::quiz(
                "quiz",
                "Quiz: prioritization",
                vec![Question::new(
                    "q1",
                    "In RICE, effort is...",
                    &["Multiplied", "The divisor", "Ignored"],
                    1,
                )],
            ),
            Stage::complete("complete", "Course complete"),
        ],
    )?;

    Catalog::new(vec![level_one, level_two, level_three])
}
