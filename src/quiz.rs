//! Quiz sub-component: collects answers and reports completion.
//!
//! A `QuizSession` only produces a `QuizOutcome` once every question has an
//! answer; the outcome is what the level runner's quiz gate waits for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::QuizError;

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct: usize,
}

impl Question {
    pub fn new(id: &str, prompt: &str, options: &[&str], correct: usize) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
        }
    }
}

/// What the quiz reports through its completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub score: u32,
    /// Question id to chosen option index
    pub answers: BTreeMap<String, usize>,
}

/// In-progress answers for one quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    answers: BTreeMap<String, usize>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            answers: BTreeMap::new(),
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Record (or replace) the answer to a question.
    pub fn answer(&mut self, question_id: &str, choice: usize) -> Result<(), QuizError> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| QuizError::UnknownQuestion(question_id.to_string()))?;

        if choice >= question.options.len() {
            return Err(QuizError::ChoiceOutOfRange {
                question: question_id.to_string(),
                choice,
            });
        }

        self.answers.insert(question_id.to_string(), choice);
        Ok(())
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    pub fn is_complete(&self) -> bool {
        self.questions
            .iter()
            .all(|q| self.answers.contains_key(&q.id))
    }

    /// Number of correctly answered questions so far.
    pub fn score(&self) -> u32 {
        self.questions
            .iter()
            .filter(|q| self.answers.get(&q.id) == Some(&q.correct))
            .count() as u32
    }

    /// The completion report, or `None` while any question is unanswered.
    pub fn complete(&self) -> Option<QuizOutcome> {
        if !self.is_complete() {
            return None;
        }
        Some(QuizOutcome {
            score: self.score(),
            answers: self.answers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QuizSession {
        QuizSession::new(vec![
            Question::new("q1", "Which is a retention metric?", &["DAU", "D30"], 1),
            Question::new("q2", "What does NPS measure?", &["Loyalty", "Revenue"], 0),
        ])
    }

    #[test]
    fn partial_answers_never_complete() {
        let mut quiz = sample();
        quiz.answer("q1", 1).unwrap();
        assert_eq!(quiz.answered(), 1);
        assert!(!quiz.is_complete());
        assert!(quiz.complete().is_none());
    }

    #[test]
    fn complete_reports_score_and_answers() {
        let mut quiz = sample();
        quiz.answer("q1", 1).unwrap();
        quiz.answer("q2", 1).unwrap();
        let outcome = quiz.complete().expect("all questions answered");
        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.answers.get("q2"), Some(&1));
    }

    #[test]
    fn reanswering_replaces_previous_choice() {
        let mut quiz = sample();
        quiz.answer("q1", 0).unwrap();
        quiz.answer("q1", 1).unwrap();
        assert_eq!(quiz.answered(), 1);
        assert_eq!(quiz.score(), 1);
    }

    #[test]
    fn rejects_unknown_question_and_bad_choice() {
        let mut quiz = sample();
        assert_eq!(
            quiz.answer("q9", 0),
            Err(QuizError::UnknownQuestion("q9".into()))
        );
        assert_eq!(
            quiz.answer("q1", 5),
            Err(QuizError::ChoiceOutOfRange {
                question: "q1".into(),
                choice: 5
            })
        );
        assert_eq!(quiz.answered(), 0);
    }

    #[test]
    fn empty_quiz_completes_immediately() {
        let quiz = QuizSession::new(Vec::new());
        assert_eq!(
            quiz.complete(),
            Some(QuizOutcome {
                score: 0,
                answers: BTreeMap::new()
            })
        );
    }
}
