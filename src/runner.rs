//! Hosting integration: drives one level through its stages.
//!
//! A `Course` bundles the sequencer and the stores over one storage backend.
//! `Course::mount` restores a level into a `LevelRunner`, which owns the only
//! durable piece of view state (the current stage) plus the transient
//! interaction flags of that stage. Every transition takes `&mut self`, so
//! transitions on one runner are strictly sequential.

use serde_json::{Value, json};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::character::CharacterCache;
use crate::completion::CompletionRegistry;
use crate::errors::ProgressionError;
use crate::gates::{GateEvaluator, GateRule, InteractionState};
use crate::progress::{NoteInput, ProgressRecord, ProgressStore};
use crate::quiz::QuizOutcome;
use crate::sequencer::StageSequencer;
use crate::stage::{Stage, StageId};
use crate::storage::{Persistence, SharedStore};

/// Summary row for a level listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStatus {
    pub level_id: u32,
    pub title: String,
    pub available: bool,
    pub complete: bool,
    pub stage_title: String,
    /// 1-based position of the current stage
    pub stage_position: usize,
    pub stage_count: usize,
}

/// Result of asking to move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The gate is closed; nothing changed
    Blocked { guidance: String },
    Moved {
        stage: StageId,
        persistence: Persistence,
    },
    /// Moved onto the terminal stage and marked the level complete
    Completed {
        stage: StageId,
        persistence: Persistence,
    },
    /// Already on the terminal stage; nothing changed
    AlreadyComplete,
}

pub struct Course {
    sequencer: StageSequencer,
    progress: ProgressStore,
    completion: CompletionRegistry,
    characters: CharacterCache,
}

impl Course {
    pub fn new(catalog: Arc<Catalog>, backend: SharedStore, strict: bool) -> Self {
        let sequencer = StageSequencer::new(catalog, strict);
        Self {
            progress: ProgressStore::new(backend.clone(), sequencer.clone()),
            completion: CompletionRegistry::new(backend.clone()),
            characters: CharacterCache::new(backend),
            sequencer,
        }
    }

    pub fn sequencer(&self) -> &StageSequencer {
        &self.sequencer
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn completion(&self) -> &CompletionRegistry {
        &self.completion
    }

    pub fn characters(&self) -> &CharacterCache {
        &self.characters
    }

    /// One status row per level, in order.
    pub fn overview(&self) -> Result<Vec<LevelStatus>, ProgressionError> {
        let completed = self.completion.completed();
        let mut rows = Vec::new();
        for level in self.sequencer.catalog().levels() {
            let record = self.progress.load(level.id)?;
            let stage = self
                .sequencer
                .resolve(level.id, &record.stage)
                .unwrap_or_else(|_| level.stages.first().id.clone());
            let position = level.stages.position(&stage).unwrap_or(0);
            rows.push(LevelStatus {
                level_id: level.id,
                title: level.title.clone(),
                available: level.id == 1 || completed.contains(&(level.id - 1)),
                complete: completed.contains(&level.id),
                stage_title: level.stages.stages()[position].title.clone(),
                stage_position: position + 1,
                stage_count: level.stages.len(),
            });
        }
        Ok(rows)
    }

    /// Restore a level for play.
    pub fn mount(&self, level_id: u32) -> Result<LevelRunner<'_>, ProgressionError> {
        self.sequencer.level(level_id)?;
        if !self.completion.is_available(level_id) {
            return Err(ProgressionError::LevelLocked {
                level_id,
                requires: level_id - 1,
            });
        }

        let mut record = self.progress.load(level_id)?;
        let resolved = self.sequencer.resolve(level_id, &record.stage)?;
        if resolved != record.stage {
            record.stage = resolved;
        }
        let stage = self.sequencer.stage(level_id, &record.stage)?;
        tracing::debug!(level_id, stage = %stage.id, "Level mounted");

        let mut runner = LevelRunner {
            course: self,
            level_id,
            record,
            stage,
            interaction: InteractionState::default(),
        };
        runner.restore_interaction();
        Ok(runner)
    }
}

pub struct LevelRunner<'c> {
    course: &'c Course,
    level_id: u32,
    record: ProgressRecord,
    stage: &'c Stage,
    interaction: InteractionState,
}

impl<'c> LevelRunner<'c> {
    pub fn level_id(&self) -> u32 {
        self.level_id
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn current_stage(&self) -> &'c Stage {
        self.stage
    }

    /// 1-based position of the current stage and the sequence length.
    pub fn position(&self) -> (usize, usize) {
        match self.course.sequencer.level(self.level_id) {
            Ok(level) => (
                level.stages.position(&self.stage.id).unwrap_or(0) + 1,
                level.stages.len(),
            ),
            Err(_) => (1, 1),
        }
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut InteractionState {
        &mut self.interaction
    }

    /// Reveal the next line of the current dialogue; `false` at the end.
    pub fn reveal_next_line(&mut self) -> bool {
        let total = self.stage.dialogue_len();
        self.interaction.reveal_next(total)
    }

    /// The quiz component's completion callback.
    pub fn on_quiz_complete(&mut self, outcome: QuizOutcome) {
        self.interaction.on_quiz_complete(outcome);
    }

    pub fn can_advance(&self) -> bool {
        GateEvaluator::can_advance(self.stage, &self.interaction)
    }

    pub fn guidance(&self) -> Option<String> {
        GateEvaluator::guidance(self.stage, &self.interaction)
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move forward if the current stage's gate allows it.
    pub fn advance(&mut self) -> Result<Advance, ProgressionError> {
        if self.stage.is_terminal() {
            return Ok(Advance::AlreadyComplete);
        }
        if let Some(guidance) = self.guidance() {
            tracing::debug!(level_id = self.level_id, stage = %self.stage.id, %guidance, "Advance blocked");
            return Ok(Advance::Blocked { guidance });
        }

        self.record_answer();
        let course = self.course;
        let next = course.sequencer.next(self.level_id, &self.stage.id)?;
        let next_stage = course.sequencer.stage(self.level_id, &next)?;
        tracing::debug!(level_id = self.level_id, from = %self.stage.id, to = %next, "Stage advanced");

        let mut persistence = self.enter(next_stage);
        if next_stage.is_terminal() {
            if course.completion.mark_complete(self.level_id) == Persistence::Unsaved {
                persistence = Persistence::Unsaved;
            }
            return Ok(Advance::Completed {
                stage: next,
                persistence,
            });
        }
        Ok(Advance::Moved {
            stage: next,
            persistence,
        })
    }

    /// Move to the previous stage; `None` when already on the first stage.
    pub fn back(&mut self) -> Result<Option<Persistence>, ProgressionError> {
        let course = self.course;
        let previous = course.sequencer.previous(self.level_id, &self.stage.id)?;
        if previous == self.stage.id {
            return Ok(None);
        }
        let stage = course.sequencer.stage(self.level_id, &previous)?;
        tracing::debug!(level_id = self.level_id, from = %self.stage.id, to = %previous, "Stage reverted");
        Ok(Some(self.enter(stage)))
    }

    /// Append a note to this level's record; `None` for a blank note.
    pub fn add_note(&mut self, note: impl Into<NoteInput>) -> Option<Persistence> {
        let text = note.into().normalize()?;
        self.record.notes.push(text);
        self.record.touch();
        Some(self.course.progress.save(self.level_id, &self.record))
    }

    /// Delete this level's record and return to the first stage. Completion
    /// marks are kept.
    pub fn reset(&mut self) -> Result<Persistence, ProgressionError> {
        let persistence = self.course.progress.reset(self.level_id);
        self.record = self.course.progress.default_record(self.level_id)?;
        self.stage = self.course.sequencer.first(self.level_id)?;
        self.interaction = InteractionState::default();
        Ok(persistence)
    }

    fn enter(&mut self, stage: &'c Stage) -> Persistence {
        self.stage = stage;
        self.record.stage = stage.id.clone();
        self.record.touch();
        self.restore_interaction();
        self.course.progress.save(self.level_id, &self.record)
    }

    /// Copy what the user did to satisfy the current gate into the record.
    fn record_answer(&mut self) {
        let state = &self.interaction;
        let answer = match &self.stage.gate {
            GateRule::Dialogue { .. } => json!({ "viewed": state.dialogue_index }),
            GateRule::Reflection { .. } => json!({ "text": state.text.trim() }),
            GateRule::Insights { .. } => json!({
                "selected": state.selected_insights,
                "conclusion": state.text.trim(),
            }),
            GateRule::Quiz => match &state.quiz {
                Some(outcome) => json!({ "score": outcome.score, "answers": outcome.answers }),
                None => return,
            },
            GateRule::None => return,
        };
        self.record.set_answer(&self.stage.id, answer);
    }

    /// Rebuild interaction flags for the current stage from saved answers, so
    /// revisiting a finished stage does not close its gate again.
    fn restore_interaction(&mut self) {
        let mut state = InteractionState::default();
        if let Some(answer) = self.record.answer(&self.stage.id) {
            match &self.stage.gate {
                GateRule::Dialogue { .. } => {
                    let viewed = answer["viewed"].as_u64().unwrap_or(0) as usize;
                    state.dialogue_index = viewed.min(self.stage.dialogue_len().saturating_sub(1));
                }
                GateRule::Reflection { .. } => {
                    state.text = answer["text"].as_str().unwrap_or_default().to_string();
                }
                GateRule::Insights { .. } => {
                    state.text = answer["conclusion"].as_str().unwrap_or_default().to_string();
                    state.selected_insights = answer["selected"]
                        .as_array()
                        .map(|ids| {
                            ids.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                }
                GateRule::Quiz => {
                    state.quiz = serde_json::from_value(answer.clone()).ok();
                }
                GateRule::None => {}
            }
        }
        self.interaction = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GateDefaults, Level, LevelsFile, StageSequence, builtin_catalog};
    use crate::stage::StageKind;
    use crate::quiz::{Question, QuizSession};
    use crate::storage::testing::UnavailableStore;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn builtin_course(backend: SharedStore) -> Course {
        let gates = GateDefaults {
            reflection_min_chars: 10,
            insights_min_chars: 10,
            insights_min_correct: 2,
        };
        Course::new(Arc::new(builtin_catalog(&gates).unwrap()), backend, true)
    }

    fn five_stage_course(backend: SharedStore, strict: bool) -> Course {
        let stages = StageSequence::new(vec![
            Stage::new("intro", StageKind::Intro, "Intro"),
            Stage::new("theory", StageKind::Theory, "Theory"),
            Stage::new("practice", StageKind::Practice, "Practice"),
            Stage::quiz(
                "quiz",
                "Quiz",
                vec![Question::new("q1", "Pick one", &["a", "b"], 0)],
            ),
            Stage::complete("complete", "Complete"),
        ])
        .unwrap();
        let level = |id| Level {
            id,
            title: format!("Level {id}"),
            summary: String::new(),
            stages: stages.clone(),
        };
        let catalog = Catalog::new(vec![level(1), level(2)]).unwrap();
        Course::new(Arc::new(catalog), backend, strict)
    }

    fn finish_quiz(runner: &mut LevelRunner<'_>) {
        let mut quiz = QuizSession::new(runner.current_stage().content.questions.clone());
        let answers: Vec<(String, usize)> = quiz
            .questions()
            .iter()
            .map(|q| (q.id.clone(), q.correct))
            .collect();
        for (id, choice) in answers {
            quiz.answer(&id, choice).unwrap();
        }
        runner.on_quiz_complete(quiz.complete().unwrap());
    }

    /// Satisfy whatever gate the current stage has.
    fn satisfy(runner: &mut LevelRunner<'_>) {
        match runner.current_stage().gate.clone() {
            GateRule::Dialogue { .. } => while runner.reveal_next_line() {},
            GateRule::Reflection { .. } => {
                runner.interaction_mut().text = "a thoughtful answer".into()
            }
            GateRule::Insights { correct, .. } => {
                let state = runner.interaction_mut();
                state.selected_insights = correct;
                state.text = "the data supports these".into();
            }
            GateRule::Quiz => finish_quiz(runner),
            GateRule::None => {}
        }
    }

    /// A levels file whose stage kinds do not match their gates.
    fn mismatched_course(backend: SharedStore) -> Course {
        let json = r#"{"levels":[{"id":1,"title":"Mixed","stages":[
            {"id":"start","kind":"theory","title":"Start"},
            {"id":"chat","kind":"theory","title":"Chat",
             "gate":{"type":"dialogue","total_messages":3}},
            {"id":"sketch","kind":"practice","title":"Sketch",
             "gate":{"type":"reflection","min_chars":5}},
            {"id":"done","kind":"complete","title":"Done"}
        ]}]}"#;
        let file: LevelsFile = serde_json::from_str(json).unwrap();
        Course::new(Arc::new(file.into_catalog().unwrap()), backend, true)
    }

    #[test]
    fn four_advances_reach_complete_and_fifth_stays() {
        let course = five_stage_course(Arc::new(MemoryStore::new()), true);
        let mut runner = course.mount(1).unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "intro");

        for _ in 0..3 {
            assert!(matches!(runner.advance().unwrap(), Advance::Moved { .. }));
        }
        assert!(matches!(runner.advance().unwrap(), Advance::Blocked { .. }));
        runner.on_quiz_complete(QuizOutcome {
            score: 0,
            answers: Default::default(),
        });
        assert!(matches!(runner.advance().unwrap(), Advance::Completed { .. }));
        assert_eq!(runner.current_stage().id.as_str(), "complete");

        assert_eq!(runner.advance().unwrap(), Advance::AlreadyComplete);
        assert_eq!(runner.current_stage().id.as_str(), "complete");
        assert!(course.completion().is_complete(1));
    }

    #[test]
    fn blocked_advance_changes_nothing() {
        let backend = Arc::new(MemoryStore::new());
        let course = builtin_course(backend.clone());
        let mut runner = course.mount(1).unwrap();

        match runner.advance().unwrap() {
            Advance::Blocked { guidance } => assert!(guidance.contains("dialogue")),
            other => panic!("Expected Blocked, got {other:?}"),
        }
        assert_eq!(runner.current_stage().id.as_str(), "intro");
        assert!(backend.get("level1_progress").unwrap().is_none());
    }

    #[test]
    fn full_playthrough_unlocks_next_level() {
        let course = builtin_course(Arc::new(MemoryStore::new()));
        assert!(matches!(
            course.mount(2),
            Err(ProgressionError::LevelLocked { level_id: 2, requires: 1 })
        ));

        let mut runner = course.mount(1).unwrap();
        let mut steps = 0;
        while !runner.is_complete() {
            satisfy(&mut runner);
            assert!(runner.can_advance(), "gate closed on {}", runner.current_stage().id);
            runner.advance().unwrap();
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert!(course.mount(2).is_ok());
    }

    #[test]
    fn progress_resumes_after_remount() {
        let backend: SharedStore = Arc::new(MemoryStore::new());
        {
            let course = builtin_course(backend.clone());
            let mut runner = course.mount(1).unwrap();
            satisfy(&mut runner);
            runner.advance().unwrap();
            runner.advance().unwrap();
            assert_eq!(runner.add_note("check day-7 retention"), Some(Persistence::Saved));
        }

        let course = builtin_course(backend);
        let runner = course.mount(1).unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "practice_ux");
        assert_eq!(runner.record().notes, vec!["check day-7 retention".to_string()]);
        assert_eq!(runner.position(), (3, 6));
    }

    #[test]
    fn back_restores_previous_answers() {
        let course = builtin_course(Arc::new(MemoryStore::new()));
        let mut runner = course.mount(1).unwrap();
        for _ in 0..3 {
            satisfy(&mut runner);
            runner.advance().unwrap();
        }
        assert_eq!(runner.current_stage().id.as_str(), "reflection");
        assert!(!runner.can_advance());

        runner.back().unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "practice_ux");
        assert!(runner.can_advance());
        assert_eq!(runner.interaction().text, "the data supports these");
    }

    #[test]
    fn back_on_first_stage_is_a_no_op() {
        let course = builtin_course(Arc::new(MemoryStore::new()));
        let mut runner = course.mount(1).unwrap();
        assert_eq!(runner.back().unwrap(), None);
        assert_eq!(runner.current_stage().id.as_str(), "intro");
    }

    #[test]
    fn reset_returns_to_first_stage_but_keeps_completion() {
        let backend = Arc::new(MemoryStore::new());
        let course = five_stage_course(backend.clone(), true);
        let mut runner = course.mount(1).unwrap();
        runner.advance().unwrap();
        runner.add_note("keep me?");
        let _ = course.completion().mark_complete(1);

        assert_eq!(runner.reset().unwrap(), Persistence::Saved);
        assert_eq!(runner.current_stage().id.as_str(), "intro");
        assert!(runner.record().notes.is_empty());
        assert!(backend.get("level1_progress").unwrap().is_none());
        assert!(course.completion().is_available(2));
    }

    #[test]
    fn stale_stage_is_clamped_in_lenient_mode() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set("level1_progress", r#"{"stage":"removed_stage","notes":["kept"]}"#)
            .unwrap();

        let lenient = five_stage_course(backend.clone(), false);
        let runner = lenient.mount(1).unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "intro");
        assert_eq!(runner.record().notes, vec!["kept".to_string()]);

        let strict = five_stage_course(backend, true);
        assert!(matches!(
            strict.mount(1),
            Err(ProgressionError::InvalidStage { .. })
        ));
    }

    #[test]
    fn unavailable_storage_keeps_the_level_playable() {
        let course = five_stage_course(Arc::new(UnavailableStore), true);
        let mut runner = course.mount(1).unwrap();
        match runner.advance().unwrap() {
            Advance::Moved { stage, persistence } => {
                assert_eq!(stage.as_str(), "theory");
                assert_eq!(persistence, Persistence::Unsaved);
            }
            other => panic!("Expected Moved, got {other:?}"),
        }
        assert!(course.progress().is_degraded());
    }

    #[test]
    fn quiz_answers_are_recorded() {
        let backend = Arc::new(MemoryStore::new());
        let course = builtin_course(backend.clone());
        let mut runner = course.mount(1).unwrap();
        while runner.current_stage().kind != StageKind::Quiz {
            satisfy(&mut runner);
            runner.advance().unwrap();
        }
        finish_quiz(&mut runner);
        runner.advance().unwrap();

        let raw: Value = serde_json::from_str(&backend.get("level1_progress").unwrap().unwrap()).unwrap();
        assert_eq!(raw["stage"], "complete");
        assert_eq!(raw["answers"]["quiz"]["score"], 3);
        assert_eq!(raw["answers"]["reflection"]["text"], "a thoughtful answer");
    }

    #[test]
    fn overview_reports_availability_and_position() {
        let course = builtin_course(Arc::new(MemoryStore::new()));
        let rows = course.overview().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].available && !rows[0].complete);
        assert!(!rows[1].available);
        assert_eq!(rows[0].stage_position, 1);
        assert_eq!(rows[0].stage_title, "First day on the team");
    }

    #[test]
    fn unknown_level_cannot_mount() {
        let course = builtin_course(Arc::new(MemoryStore::new()));
        assert!(matches!(
            course.mount(99),
            Err(ProgressionError::UnknownLevel { level_id: 99 })
        ));
    }

    #[test]
    fn gate_drives_answers_when_kind_disagrees() {
        let backend: SharedStore = Arc::new(MemoryStore::new());
        let course = mismatched_course(backend.clone());
        let mut runner = course.mount(1).unwrap();
        runner.advance().unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "chat");

        // Dialogue gate with no scripted lines still counts its messages.
        assert!(!runner.can_advance());
        assert!(runner.reveal_next_line());
        assert!(runner.reveal_next_line());
        assert!(!runner.reveal_next_line());
        assert!(runner.can_advance());
        runner.advance().unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "sketch");

        runner.interaction_mut().text = "hello world".into();
        assert!(runner.can_advance());
        assert!(matches!(runner.advance().unwrap(), Advance::Completed { .. }));

        runner.back().unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "sketch");
        assert_eq!(runner.interaction().text, "hello world");
        assert!(runner.can_advance());

        runner.back().unwrap();
        assert_eq!(runner.current_stage().id.as_str(), "chat");
        assert_eq!(runner.interaction().dialogue_index, 2);
        assert!(runner.can_advance());

        let raw: Value =
            serde_json::from_str(&backend.get("level1_progress").unwrap().unwrap()).unwrap();
        assert_eq!(raw["answers"]["sketch"]["text"], "hello world");
        assert_eq!(raw["answers"]["chat"]["viewed"], 2);
    }
}
