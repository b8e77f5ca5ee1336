//! Level listing, status, notes and reset.

use anyhow::{Result, bail};

use pmquest::config::Config;
use pmquest::progress::NoteEntry;
use pmquest::stage::StageId;
use pmquest::storage::Persistence;
use pmquest::ui::icons::{CHECK, LOCK, PLAY, WARN};

use super::Workspace;

pub async fn cmd_levels(config: &Config) -> Result<()> {
    let ws = Workspace::open(config).await?;
    let rows = ws.course.overview()?;

    println!();
    println!("{:<6} {:<28} {:<10} Stage", "Level", "Title", "State");
    println!("{:<6} {:<28} {:<10} -----", "------", "----------------------------", "----------");
    for row in rows {
        let (icon, state) = if row.complete {
            (CHECK, "complete")
        } else if row.available {
            (PLAY, "open")
        } else {
            (LOCK, "locked")
        };
        println!(
            "{:<6} {:<28} {}{:<10} {} ({}/{})",
            row.level_id, row.title, icon, state, row.stage_title, row.stage_position, row.stage_count
        );
    }
    println!();
    Ok(())
}

pub async fn cmd_status(config: &Config, level_id: u32) -> Result<()> {
    let ws = Workspace::open(config).await?;
    let course = &ws.course;
    let level = course.sequencer().level(level_id)?;

    println!();
    println!("Level {}: {}", level.id, level.title);
    println!("{}", "=".repeat(level.title.len() + 7 + level.id.to_string().len()));
    if !level.summary.is_empty() {
        println!("{}", level.summary);
    }
    println!();

    if !course.completion().is_available(level_id) {
        println!("{}Locked: complete level {} first.", LOCK, level_id - 1);
        println!();
        return Ok(());
    }

    let runner = course.mount(level_id)?;
    let (position, count) = runner.position();
    let stage = runner.current_stage();
    let name = course.sequencer().display_name(level_id, &stage.id)?;
    println!("Stage:    {} ({}/{})", name, position, count);
    if course.completion().is_complete(level_id) {
        println!("Status:   {}complete", CHECK);
    } else {
        println!("Status:   in progress");
    }
    if let Some(updated) = runner.record().updated_at() {
        println!("Updated:  {}", updated);
    }

    let notes = &runner.record().notes;
    if !notes.is_empty() {
        println!();
        println!("Notes:");
        for note in notes {
            println!("  - {}", note);
        }
    }
    println!();
    Ok(())
}

pub async fn cmd_note(config: &Config, level_id: u32, text: &str, stage: Option<&str>) -> Result<()> {
    let ws = Workspace::open(config).await?;
    let course = &ws.course;

    let stage = match stage {
        Some(id) => {
            let id = StageId::new(id);
            course.sequencer().display_name(level_id, &id)?;
            Some(id)
        }
        None => None,
    };
    let (record, persistence) = course.progress().append_note(
        level_id,
        NoteEntry {
            text: text.to_string(),
            stage,
        },
    )?;

    match persistence {
        None => bail!("Note is empty"),
        Some(Persistence::Unsaved) => {
            println!("{}Note kept for this session only: storage is unavailable", WARN)
        }
        Some(Persistence::Saved) => println!("Note saved ({} total)", record.notes.len()),
    }
    Ok(())
}

pub async fn cmd_reset(config: &Config, level_id: u32, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    let ws = Workspace::open(config).await?;
    let course = &ws.course;
    let level = course.sequencer().level(level_id)?;

    if !force {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "This will reset all progress in level {} ({}). Are you sure?",
                level.id, level.title
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    if course.progress().reset(level_id).is_saved() {
        println!("Reset complete");
    } else {
        println!("{}Reset could not be saved: storage is unavailable", WARN);
    }
    Ok(())
}
