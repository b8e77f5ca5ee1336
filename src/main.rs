use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod cmd;

#[derive(Parser)]
#[command(name = "pmquest")]
#[command(version, about = "Gamified product-management course")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding progress, pmquest.toml and an optional levels.json
    #[arg(long, global = true, env = "PMQUEST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List levels with availability and progress
    Levels,
    /// Show progress for one level
    Status { level: u32 },
    /// Play a level interactively
    Play { level: u32 },
    /// Add a note to a level
    Note {
        level: u32,
        text: String,
        /// Tag the note with a stage id
        #[arg(long)]
        stage: Option<String>,
    },
    /// Return a level to its first stage
    Reset {
        level: u32,
        #[arg(long)]
        force: bool,
    },
    /// List, show or select a character
    Character {
        #[command(subcommand)]
        command: Option<CharacterCommands>,
    },
    /// View, validate or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum CharacterCommands {
    /// List available characters
    List,
    /// Show the selected character
    Show,
    /// Select a character
    Select {
        id: String,
        /// Skip the server and select from the local roster
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default pmquest.toml file
    Init,
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "pmquest=debug" } else { "warn" }));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(pmquest::config::default_data_dir);
    let config = pmquest::config::Config::new(data_dir)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "Configuration loaded");

    match &cli.command {
        Commands::Levels => cmd::cmd_levels(&config).await?,
        Commands::Status { level } => cmd::cmd_status(&config, *level).await?,
        Commands::Play { level } => cmd::cmd_play(&config, *level).await?,
        Commands::Note { level, text, stage } => {
            cmd::cmd_note(&config, *level, text, stage.as_deref()).await?
        }
        Commands::Reset { level, force } => cmd::cmd_reset(&config, *level, *force).await?,
        Commands::Character { command } => cmd::cmd_character(&config, command.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
