//! Plain-text rendering of stages for the terminal.

use console::style;

use crate::gates::InteractionState;
use crate::stage::{Stage, StageKind};
use crate::ui::icons::{BOOK, PENCIL, SPEECH, TROPHY};

const BAR_WIDTH: usize = 20;

/// `[#####.....] 3/6`
pub fn progress_bar(position: usize, count: usize) -> String {
    let count = count.max(1);
    let filled = (position.min(count) * BAR_WIDTH) / count;
    format!(
        "[{}{}] {}/{}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        position,
        count
    )
}

pub fn header(stage: &Stage, position: usize, count: usize) -> String {
    let icon = match stage.kind {
        StageKind::Intro | StageKind::Dialogue => SPEECH,
        StageKind::Theory | StageKind::Practice | StageKind::Insights => BOOK,
        StageKind::Reflection | StageKind::Quiz => PENCIL,
        StageKind::Complete => TROPHY,
    };
    format!(
        "{}{} {}  {}",
        icon,
        style(stage.kind.label()).dim(),
        style(&stage.title).bold(),
        progress_bar(position, count)
    )
}

/// Dialogue lines revealed so far.
pub fn dialogue(stage: &Stage, state: &InteractionState) -> Vec<String> {
    stage
        .content
        .lines
        .iter()
        .take(state.dialogue_index + 1)
        .map(|line| format!("{}: {}", line.speaker, line.text))
        .collect()
}

/// Body text and prompt of a non-dialogue stage.
pub fn body(stage: &Stage) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(body) = &stage.content.body {
        out.push(body.clone());
    }
    if let Some(prompt) = &stage.content.prompt {
        out.push(format!("{}", style(prompt).italic()));
    }
    out
}

/// Insight options with a selection marker.
pub fn insights(stage: &Stage, state: &InteractionState) -> Vec<String> {
    stage
        .content
        .insights
        .iter()
        .map(|option| {
            let mark = if state.selected_insights.contains(&option.id) {
                "[x]"
            } else {
                "[ ]"
            };
            format!("{} {}", mark, option.text)
        })
        .collect()
}
