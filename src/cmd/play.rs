//! Interactive level play.

use anyhow::Result;
use dialoguer::{Input, MultiSelect, Select, theme::ColorfulTheme};

use pmquest::config::Config;
use pmquest::quiz::QuizSession;
use pmquest::runner::{Advance, LevelRunner};
use pmquest::gates::{GateRule, InteractionState};
use pmquest::stage::Stage;
use pmquest::storage::Persistence;
use pmquest::ui::icons::{CHECK, TROPHY, WARN};
use pmquest::ui::stage_view;

use super::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NextLine,
    Write,
    PickInsights,
    TakeQuiz,
    Continue,
    Back,
    Note,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::NextLine => "Next line",
            Action::Write => "Write answer",
            Action::PickInsights => "Select insights",
            Action::TakeQuiz => "Take the quiz",
            Action::Continue => "Continue",
            Action::Back => "Back",
            Action::Note => "Add a note",
            Action::Quit => "Save and quit",
        }
    }
}

/// Menu entries for a stage, driven by what its gate asks of the user.
fn actions_for(stage: &Stage, state: &InteractionState, position: usize) -> Vec<Action> {
    let mut actions = Vec::new();
    match &stage.gate {
        GateRule::Dialogue { .. } => {
            if state.dialogue_index + 1 < stage.dialogue_len() {
                actions.push(Action::NextLine);
            }
        }
        GateRule::Reflection { .. } => actions.push(Action::Write),
        GateRule::Insights { .. } => {
            actions.push(Action::PickInsights);
            actions.push(Action::Write);
        }
        GateRule::Quiz => actions.push(Action::TakeQuiz),
        GateRule::None => {}
    }
    if !stage.is_terminal() {
        actions.push(Action::Continue);
    }
    if position > 1 {
        actions.push(Action::Back);
    }
    actions.push(Action::Note);
    actions.push(Action::Quit);
    actions
}

fn render(runner: &LevelRunner<'_>) {
    let stage = runner.current_stage();
    let (position, count) = runner.position();
    println!();
    println!("{}", stage_view::header(stage, position, count));
    println!();
    for line in stage_view::dialogue(stage, runner.interaction()) {
        println!("  {}", line);
    }
    for line in stage_view::body(stage) {
        println!("  {}", line);
    }
    for line in stage_view::insights(stage, runner.interaction()) {
        println!("  {}", line);
    }
    if !runner.interaction().text.is_empty() {
        println!();
        println!("  Your answer: {}", runner.interaction().text);
    }
    println!();
}

fn warn_unsaved(persistence: Persistence) {
    if !persistence.is_saved() {
        println!("{}Progress could not be saved; it is kept for this session only", WARN);
    }
}

fn take_quiz(runner: &mut LevelRunner<'_>, theme: &ColorfulTheme) -> Result<()> {
    let mut quiz = QuizSession::new(runner.current_stage().content.questions.clone());
    let questions = quiz.questions().to_vec();
    for question in &questions {
        let choice = Select::with_theme(theme)
            .with_prompt(&question.prompt)
            .items(&question.options)
            .default(0)
            .interact()?;
        quiz.answer(&question.id, choice)?;
    }
    if let Some(outcome) = quiz.complete() {
        println!("Score: {}/{}", outcome.score, questions.len());
        runner.on_quiz_complete(outcome);
    }
    Ok(())
}

fn pick_insights(runner: &mut LevelRunner<'_>, theme: &ColorfulTheme) -> Result<()> {
    let options = &runner.current_stage().content.insights;
    let labels: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
    let defaults: Vec<bool> = options
        .iter()
        .map(|o| runner.interaction().selected_insights.contains(&o.id))
        .collect();
    let picked = MultiSelect::with_theme(theme)
        .with_prompt("Which conclusions does the data support?")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    let ids: Vec<String> = picked.into_iter().map(|i| options[i].id.clone()).collect();
    let state = runner.interaction_mut();
    state.selected_insights = ids.into_iter().collect();
    Ok(())
}

pub async fn cmd_play(config: &Config, level_id: u32) -> Result<()> {
    let ws = Workspace::open(config).await?;
    let mut runner = ws.course.mount(level_id)?;
    let theme = ColorfulTheme::default();

    loop {
        render(&runner);
        if runner.is_complete() {
            println!("{}Level {} complete!", TROPHY, level_id);
        }

        let actions = actions_for(
            runner.current_stage(),
            runner.interaction(),
            runner.position().0,
        );
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let selection = Select::with_theme(&theme)
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[selection] {
            Action::NextLine => {
                runner.reveal_next_line();
            }
            Action::Write => {
                let text: String = Input::with_theme(&theme)
                    .with_prompt("Your answer")
                    .with_initial_text(runner.interaction().text.clone())
                    .allow_empty(true)
                    .interact_text()?;
                runner.interaction_mut().text = text;
            }
            Action::PickInsights => pick_insights(&mut runner, &theme)?,
            Action::TakeQuiz => take_quiz(&mut runner, &theme)?,
            Action::Continue => match runner.advance()? {
                Advance::Blocked { guidance } => println!("{}{}", WARN, guidance),
                Advance::Moved { persistence, .. } => warn_unsaved(persistence),
                Advance::Completed { persistence, .. } => {
                    warn_unsaved(persistence);
                    if ws.course.completion().is_available(level_id + 1)
                        && ws.course.sequencer().level(level_id + 1).is_ok()
                    {
                        println!("{}Level {} unlocked", CHECK, level_id + 1);
                    }
                }
                Advance::AlreadyComplete => {}
            },
            Action::Back => {
                if let Some(persistence) = runner.back()? {
                    warn_unsaved(persistence);
                }
            }
            Action::Note => {
                let text: String = Input::with_theme(&theme)
                    .with_prompt("Note")
                    .allow_empty(true)
                    .interact_text()?;
                if let Some(persistence) = runner.add_note(text) {
                    warn_unsaved(persistence);
                }
            }
            Action::Quit => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmquest::stage::{StageKind, line};

    #[test]
    fn dialogue_gate_without_script_offers_next_line() {
        let mut stage = Stage::new("chat", StageKind::Theory, "Chat");
        stage.gate = GateRule::Dialogue { total_messages: 3 };
        let mut state = InteractionState::default();

        let actions = actions_for(&stage, &state, 2);
        assert_eq!(actions[0], Action::NextLine);
        assert!(actions.contains(&Action::Back));

        state.dialogue_index = 2;
        assert!(!actions_for(&stage, &state, 2).contains(&Action::NextLine));
    }

    #[test]
    fn scripted_dialogue_stops_at_last_line() {
        let stage = Stage::dialogue(
            "intro",
            "Intro",
            vec![line("Maya", "Welcome"), line("Maya", "Let's start")],
        );
        let mut state = InteractionState::default();
        assert!(actions_for(&stage, &state, 1).contains(&Action::NextLine));
        state.dialogue_index = 1;
        let actions = actions_for(&stage, &state, 1);
        assert_eq!(actions, vec![Action::Continue, Action::Note, Action::Quit]);
    }

    #[test]
    fn reflection_gate_on_practice_stage_offers_write() {
        let mut stage = Stage::new("sketch", StageKind::Practice, "Sketch");
        stage.gate = GateRule::Reflection { min_chars: 5 };
        let actions = actions_for(&stage, &InteractionState::default(), 3);
        assert_eq!(actions[0], Action::Write);
        assert!(actions.contains(&Action::Continue));
    }

    #[test]
    fn reflection_kind_without_gate_offers_no_input() {
        let stage = Stage::new("notes", StageKind::Reflection, "Notes");
        let actions = actions_for(&stage, &InteractionState::default(), 1);
        assert_eq!(actions, vec![Action::Continue, Action::Note, Action::Quit]);
    }

    #[test]
    fn terminal_stage_has_no_continue() {
        let stage = Stage::complete("done", "Done");
        let actions = actions_for(&stage, &InteractionState::default(), 4);
        assert!(!actions.contains(&Action::Continue));
        assert!(actions.contains(&Action::Back));
    }
}
