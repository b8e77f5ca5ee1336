//! Configuration view and validation commands (`pmquest config`).

use anyhow::{Context, Result};

use pmquest::config::{Config, QuestToml};

use super::super::ConfigCommands;

fn print_toml(toml: &QuestToml) {
    println!("[navigation]");
    match toml.navigation.strict {
        Some(strict) => println!("  strict = {}", strict),
        None => println!("  strict = {} (build default)", toml.strict()),
    }
    println!();
    println!("[gates]");
    println!("  reflection_min_chars = {}", toml.gates.reflection_min_chars);
    println!("  insights_min_chars = {}", toml.gates.insights_min_chars);
    println!("  insights_min_correct = {}", toml.gates.insights_min_correct);
    println!();
    if let Some(url) = &toml.api.base_url {
        println!("[api]");
        println!("  base_url = \"{}\"", url);
        println!();
    }
    if let Some(id) = &toml.user.id {
        println!("[user]");
        println!("  id = \"{}\"", id);
        println!();
    }
}

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("pmquest Configuration");
            println!("=====================");
            println!();
            println!("Data dir:    {}", config.data_dir.display());

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("Config file: none (using defaults)");
            }
            let levels_file = config.levels_file();
            if levels_file.exists() {
                println!("Levels file: {}", levels_file.display());
            } else {
                println!("Levels file: none (built-in course)");
            }
            println!();
            print_toml(&config.toml);

            println!("Effective values (with env/CLI overrides):");
            println!("  strict = {}", config.strict());
            println!("  api_base = \"{}\"", config.api_base);
            match &config.user_id {
                Some(id) => println!("  user = \"{}\"", id),
                None => println!("  user = guest"),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let mut warnings = config.validate();
            if let Err(err) = config.load_catalog() {
                warnings.push(format!("{err:#}"));
            }

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("pmquest.toml already exists at {}", config_path.display());
                return Ok(());
            }
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("Failed to create data directory: {}", config.data_dir.display())
            })?;
            QuestToml::default().save(&config_path)?;
            println!("Created {}", config_path.display());
        }
    }
    Ok(())
}
