//! Character roster and selection (`pmquest character`).

use anyhow::{Context, Result, bail};

use pmquest::character::{Character, CharacterClient, find_in_roster, roster};
use pmquest::config::Config;
use pmquest::ui::icons::{CHECK, WARN};

use super::super::CharacterCommands;
use super::Workspace;

fn print_character(character: &Character) {
    println!("{} ({})", character.name, character.id);
    println!("  type: {}", character.character_type);
    for (stat, value) in &character.stats {
        println!("  {:<10} {}", stat, value);
    }
}

pub async fn cmd_character(config: &Config, command: Option<CharacterCommands>) -> Result<()> {
    match command {
        None | Some(CharacterCommands::List) => {
            println!();
            println!("{:<12} {:<22} Type", "Id", "Name");
            println!("{:<12} {:<22} ----", "------------", "----------------------");
            for character in roster() {
                println!(
                    "{:<12} {:<22} {}",
                    character.id, character.name, character.character_type
                );
            }
            println!();
        }
        Some(CharacterCommands::Show) => {
            let ws = Workspace::open(config).await?;
            match ws.course.characters().selected() {
                Some(character) => print_character(&character),
                None => println!("No character selected. Run 'pmquest character select <id>'."),
            }
        }
        Some(CharacterCommands::Select { id, offline }) => {
            let ws = Workspace::open(config).await?;
            let Some(local) = find_in_roster(&id) else {
                bail!("Unknown character '{}'. Run 'pmquest character list'.", id);
            };

            let character = if offline {
                local
            } else {
                let mut client = CharacterClient::new(config.api_base.clone());
                if let Some(token) = ws.user.as_ref().and_then(|u| u.token.clone()) {
                    client = client.with_token(token);
                }
                client
                    .select(&local.id, &local.character_type)
                    .await
                    .with_context(|| {
                        format!(
                            "Character selection failed at {}; retry with --offline",
                            config.api_base
                        )
                    })?
            };

            if ws.course.characters().store(&character).is_saved() {
                println!("{}Selected {}", CHECK, character.name);
            } else {
                println!(
                    "{}Selected {} for this session only: storage is unavailable",
                    WARN, character.name
                );
            }
        }
    }
    Ok(())
}
